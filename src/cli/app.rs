use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, load_local_env_overrides, LoadedConfig, LOCAL_ENV};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();
    let local_env = load_local_env_overrides();
    let LoadedConfig {
        config,
        path,
        from_file,
    } = load_config(cli.config.as_ref()).await?;

    let _log_guard = init_logging(
        &cli.log_level,
        cli.debug,
        cli.log_json,
        config.logging.dir.as_deref(),
    )?;

    info!("Starting casefill v{}", env!("CARGO_PKG_VERSION"));
    match local_env {
        Ok(Some(applied)) => info!(applied, "Loaded environment overrides from {}", LOCAL_ENV),
        Ok(None) => {}
        Err(err) => warn!(error = %err, "Ignoring {}", LOCAL_ENV),
    }
    if from_file {
        info!("Loaded configuration from: {}", path.display());
    } else {
        warn!("Config file not found, using defaults: {}", path.display());
    }

    let cli_context = CliContext::new(config, path);
    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
