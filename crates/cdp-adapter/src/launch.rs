//! Starting Chrome for a run, or reusing the one the operator already has open.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use futures::io::{AsyncBufReadExt, BufReader};
use futures::StreamExt;
use tokio::time::timeout;
use tracing::{debug, info};
use which::which;

use crate::error::AdapterError;

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Env var naming the Chrome binary when it is not on `PATH`.
pub const CHROME_ENV: &str = "CASEFILL_CHROME";

#[derive(Clone, Debug)]
pub struct CdpConfig {
    /// Chrome binary; looked up when unset.
    pub executable: Option<PathBuf>,
    /// Profile directory, kept between runs so the login cookie survives.
    pub user_data_dir: PathBuf,
    pub headless: bool,
    /// Upper bound on a single protocol command.
    pub default_deadline_ms: u64,
    /// DevTools endpoint of a running browser; nothing is launched when set.
    pub websocket_url: Option<String>,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            executable: None,
            user_data_dir: PathBuf::from(".casefill-profile"),
            headless: false,
            default_deadline_ms: 30_000,
            websocket_url: None,
        }
    }
}

#[cfg(windows)]
const CHROME_NAMES: &[&str] = &["chrome.exe", "msedge.exe"];
#[cfg(not(windows))]
const CHROME_NAMES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
];

fn install_locations() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    } else if cfg!(windows) {
        ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|key| env::var_os(key))
            .map(|root| PathBuf::from(root).join("Google/Chrome/Application/chrome.exe"))
            .collect()
    } else {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }
}

/// First existing Chrome among: the configured path, `CASEFILL_CHROME`,
/// `PATH`, then the usual install locations.
pub fn locate_chrome(configured: Option<&Path>) -> Option<PathBuf> {
    let from_env = env::var_os(CHROME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(from_env)
        .find(|path| path.exists())
        .or_else(|| CHROME_NAMES.iter().find_map(|name| which(name).ok()))
        .or_else(|| install_locations().into_iter().find(|path| path.exists()))
}

/// Websocket URL of the browser endpoint, plus the child process when one was
/// launched here.
pub(crate) async fn endpoint(cfg: &CdpConfig) -> Result<(Option<Child>, String), AdapterError> {
    if let Some(url) = &cfg.websocket_url {
        info!(target: "cdp-transport", %url, "attaching to running browser");
        return Ok((None, url.clone()));
    }

    let mut child = browser_config(cfg)?
        .launch()
        .map_err(|err| AdapterError::io(format!("failed to launch chrome: {err}")))?;
    let url = read_devtools_url(&mut child).await?;
    info!(target: "cdp-transport", %url, headless = cfg.headless, "chrome launched");
    Ok((Some(child), url))
}

fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    let executable = locate_chrome(cfg.executable.as_deref()).ok_or_else(|| {
        AdapterError::io("Chrome/Chromium executable not found; set browser.executable or CASEFILL_CHROME, or pass --ws-url")
    })?;
    let profile = env::current_dir()
        .map(|cwd| cwd.join(&cfg.user_data_dir))
        .map_err(|err| AdapterError::internal(format!("resolving profile dir: {err}")))?;
    std::fs::create_dir_all(&profile).map_err(|err| {
        AdapterError::internal(format!("creating profile dir {}: {err}", profile.display()))
    })?;
    debug!(target: "cdp-transport", chrome = %executable.display(), profile = %profile.display(), "chrome launch settings");

    let mut args = vec![
        "--no-first-run",
        "--no-default-browser-check",
        "--disable-popup-blocking",
        "--disable-sync",
        "--password-store=basic",
        "--remote-allow-origins=*",
        "--lang=pt-BR",
        "--window-size=1440,900",
    ];
    if cfg.headless {
        args.push("--headless=new");
    }

    let mut builder = BrowserConfig::builder()
        .chrome_executable(executable)
        .user_data_dir(profile)
        .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
        .launch_timeout(LAUNCH_TIMEOUT)
        .args(args);
    if !cfg.headless {
        builder = builder.with_head();
    }
    builder
        .build()
        .map_err(|err| AdapterError::internal(format!("chrome launch settings: {err}")))
}

/// The endpoint Chrome prints on stderr once DevTools is listening.
fn devtools_url(line: &str) -> Option<&str> {
    let (_, url) = line.split_once("DevTools listening on ")?;
    let url = url.trim();
    url.starts_with("ws://").then_some(url)
}

async fn read_devtools_url(child: &mut Child) -> Result<String, AdapterError> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AdapterError::internal("chrome started without a stderr pipe"))?;
    let mut lines = BufReader::new(stderr).lines();

    let scan = async {
        let mut last = String::new();
        while let Some(line) = lines.next().await {
            let line = line.map_err(|err| AdapterError::io(format!("reading chrome stderr: {err}")))?;
            if let Some(url) = devtools_url(&line) {
                return Ok(url.to_string());
            }
            last = line;
        }
        Err(AdapterError::io(format!(
            "chrome exited before opening DevTools (last output: {last})"
        )))
    };

    timeout(LAUNCH_TIMEOUT, scan).await.map_err(|_| {
        AdapterError::io(format!(
            "chrome did not open DevTools within {}s",
            LAUNCH_TIMEOUT.as_secs()
        ))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn devtools_line_yields_the_browser_socket() {
        let line = "DevTools listening on ws://127.0.0.1:40123/devtools/browser/5b1c\n";
        assert_eq!(
            devtools_url(line),
            Some("ws://127.0.0.1:40123/devtools/browser/5b1c")
        );
        assert_eq!(devtools_url("[1018/101010.1:ERROR:gpu_init.cc] failed"), None);
    }

    #[test]
    #[serial]
    fn configured_binary_wins_over_the_environment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let configured = dir.path().join("chrome-configured");
        let from_env = dir.path().join("chrome-env");
        std::fs::write(&configured, b"").expect("write");
        std::fs::write(&from_env, b"").expect("write");

        env::set_var(CHROME_ENV, &from_env);
        assert_eq!(locate_chrome(Some(&configured)), Some(configured.clone()));
        assert_eq!(
            locate_chrome(Some(&dir.path().join("missing"))),
            Some(from_env.clone())
        );
        env::remove_var(CHROME_ENV);
    }
}
