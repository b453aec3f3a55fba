//! Browser session: launching or attaching to Chrome, opening the site and
//! waiting for the operator to log in.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use action_primitives::{
    poll_until, ActionError, ActionPrimitives, DefaultActionPrimitives, ExecCtx, WaitTier,
    WaitTiers,
};
use casefill_core_types::{ExecRoute, PageId, SessionId};
use cdp_adapter::CdpAdapter;
use tracing::{debug, info, warn};

use crate::config::{BrowserConfig, SiteConfig};
use crate::errors::{CaseFillError, Result};

/// How the login wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// The home page was reached within the timeout.
    Detected(String),
    /// The operator confirmed on the terminal after the timeout.
    Confirmed,
}

pub struct BrowserSession {
    adapter: Option<Arc<CdpAdapter>>,
    primitives: Arc<dyn ActionPrimitives>,
    ctx: ExecCtx,
}

impl BrowserSession {
    /// Starts Chrome (or attaches to `ws_url`) and binds one page for the run.
    pub async fn launch(config: &BrowserConfig, tiers: WaitTiers) -> Result<Self> {
        let adapter = Arc::new(
            CdpAdapter::new(config.cdp_config())
                .map_err(|err| CaseFillError::Session(err.to_string()))?,
        );
        let primitives = DefaultActionPrimitives::new(Arc::clone(&adapter), tiers);
        primitives
            .ensure_adapter_ready()
            .await
            .map_err(|err| CaseFillError::Session(err.to_string()))?;
        info!(
            headless = config.headless,
            attached = config.ws_url.is_some(),
            "Browser session ready"
        );

        let mut session = Self::attach(Arc::new(primitives), Self::fresh_ctx());
        session.adapter = Some(adapter);
        Ok(session)
    }

    /// Wraps primitives that are already connected.
    pub fn attach(primitives: Arc<dyn ActionPrimitives>, ctx: ExecCtx) -> Self {
        Self {
            adapter: None,
            primitives,
            ctx,
        }
    }

    fn fresh_ctx() -> ExecCtx {
        ExecCtx::new(ExecRoute::main_frame(SessionId::new(), PageId::new()))
    }

    pub fn primitives(&self) -> Arc<dyn ActionPrimitives> {
        Arc::clone(&self.primitives)
    }

    pub fn ctx(&self) -> &ExecCtx {
        &self.ctx
    }

    /// Navigates to the site and waits until the operator reaches the home
    /// page. After the timeout the operator may confirm on the terminal.
    pub async fn open_site(&self, site: &SiteConfig) -> Result<LoginState> {
        info!(url = %site.url, "Opening site");
        self.primitives
            .navigate(&self.ctx, &site.url, WaitTier::Long)
            .await
            .map_err(|err| CaseFillError::Session(format!("could not open {}: {err}", site.url)))?;

        info!(
            timeout_secs = site.login_timeout_secs,
            "Waiting for login (home page containing '{}')", site.home_marker
        );
        let timeout = Duration::from_secs(site.login_timeout_secs);
        let detected = poll_until(timeout, || self.at_home(&site.home_marker))
            .await
            .map_err(|err| CaseFillError::Session(err.to_string()))?;
        if let Some(url) = detected {
            info!(url = %url, "Login detected");
            return Ok(LoginState::Detected(url));
        }

        if !site.prompt_on_login_timeout {
            return Err(CaseFillError::Session(format!(
                "login not detected within {}s",
                site.login_timeout_secs
            )));
        }
        warn!("Login not detected in time, waiting for confirmation on the terminal");
        confirm_on_terminal("Login not detected. Press ENTER once the eLaw home page is open... ")
            .await?;
        if self.at_home(&site.home_marker).await.ok().flatten().is_none() {
            warn!("Continuing without seeing the home page");
        }
        Ok(LoginState::Confirmed)
    }

    async fn at_home(&self, marker: &str) -> std::result::Result<Option<String>, ActionError> {
        match self.primitives.current_url(&self.ctx).await {
            Ok(url) => Ok(url.contains(marker).then_some(url)),
            Err(err @ ActionError::SessionLost(_)) => Err(err),
            Err(err) => {
                debug!(error = %err, "URL not readable yet");
                Ok(None)
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Some(adapter) = &self.adapter {
            adapter.shutdown().await;
            info!("Browser session closed");
        }
    }
}

async fn confirm_on_terminal(prompt: &'static str) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let mut stderr = io::stderr();
        write!(stderr, "{prompt}")?;
        stderr.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok::<_, io::Error>(())
    })
    .await
    .map_err(|err| CaseFillError::Session(err.to_string()))??;
    Ok(())
}
