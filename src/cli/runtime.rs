use std::env;
use std::fs as stdfs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use casefill_cli::Config;
use tokio::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "casefill.log";
pub const LOCAL_ENV: &str = "config/local.env";

/// Loads `config/local.env` without overriding variables already set.
/// Returns the number of variables applied, or `None` when there is no file.
pub fn load_local_env_overrides() -> Result<Option<usize>> {
    let path = Path::new(LOCAL_ENV);
    if !path.exists() {
        return Ok(None);
    }
    let contents = stdfs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(apply_env_lines(&contents)))
}

fn apply_env_lines(contents: &str) -> usize {
    let mut applied = 0;
    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || env::var(key).is_ok() {
            continue;
        }
        env::set_var(key, unescape_value(value.trim()));
        applied += 1;
    }
    applied
}

/// Console logs go to stderr so command output stays clean on stdout. With
/// `log_dir` a daily-rolling file layer is added; keep the guard alive for
/// the whole process.
pub fn init_logging(
    level: &str,
    debug: bool,
    json: bool,
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            stdfs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let initialised = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .try_init()
    };
    initialised.context("Failed to initialise logging")?;

    Ok(guard)
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    /// Whether `path` existed; otherwise `config` holds the defaults.
    pub from_file: bool,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/config.yaml > ~/.config/casefill/config.yaml
            let local_config = PathBuf::from("config/config.yaml");
            if local_config.exists() {
                local_config
            } else {
                let mut path = dirs::config_dir().context("Failed to get config directory")?;
                path.push("casefill");
                path.push("config.yaml");
                path
            }
        }
    };

    let (mut config, from_file) = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        (config, true)
    } else {
        (Config::default(), false)
    };
    config.apply_env_overrides();

    Ok(LoadedConfig {
        config,
        path: config_path,
        from_file,
    })
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}
