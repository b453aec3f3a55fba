//! Navigate primitive plus URL and liveness queries on the top document

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, WaitTier},
};
use cdp_adapter::Cdp;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

/// Navigates the session's page and waits for the document to become ready
/// within the tier. Navigation always targets the top document.
pub async fn execute_navigate(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    url: &str,
    wait_tier: WaitTier,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        url = %url,
        wait_tier = ?wait_tier,
        "Executing navigate primitive"
    );

    if !is_navigable(url) {
        return Err(ActionError::Internal(format!("Invalid URL: '{url}'")));
    }

    let context = primitives.main_context(ctx).await?;
    debug!("Issuing CDP Page.navigate command");
    primitives
        .adapter()
        .navigate(context.page, url, primitives.tiers().duration(wait_tier))
        .await
        .map_err(|err| ActionError::from_adapter(err, url))?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        "Navigate completed successfully"
    );
    Ok(ActionReport::success(started_at, latency_ms))
}

pub async fn execute_current_url(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
) -> Result<String, ActionError> {
    let context = primitives.main_context(ctx).await?;
    primitives
        .adapter()
        .current_url(context.page)
        .await
        .map_err(|err| ActionError::from_adapter(err, "location"))
}

/// Evaluates a trivial expression; any transport failure means the session is gone.
pub async fn execute_ping(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
) -> Result<(), ActionError> {
    let context = primitives.main_context(ctx).await?;
    let value = primitives
        .adapter()
        .evaluate_script(context.page, "1 + 1")
        .await
        .map_err(|err| ActionError::SessionLost(err.to_string()))?;
    if value.as_i64() == Some(2) {
        Ok(())
    } else {
        Err(ActionError::SessionLost(format!(
            "unexpected liveness answer: {value}"
        )))
    }
}

fn is_navigable(url: &str) -> bool {
    url.starts_with("http://")
        || url.starts_with("https://")
        || url.starts_with("file://")
        || url == "about:blank"
}

#[cfg(test)]
mod tests {
    use super::is_navigable;

    #[test]
    fn url_validation() {
        assert!(is_navigable("https://pje.example.jus.br/login.seam"));
        assert!(is_navigable("http://localhost:8080"));
        assert!(is_navigable("file:///tmp/form.html"));
        assert!(is_navigable("about:blank"));

        assert!(!is_navigable(""));
        assert!(!is_navigable("pje.example.jus.br"));
        assert!(!is_navigable("ftp://example.com"));
    }
}
