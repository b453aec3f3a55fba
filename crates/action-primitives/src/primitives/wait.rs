//! Wait primitive - bounded polling on visibility, absence and URL

use crate::{
    errors::ActionError,
    locator::anchor_selector,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, WaitCondition, WaitTier},
    waiting::poll_until,
};
use cdp_adapter::{Cdp, ResolvedExecutionContext};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub async fn execute_wait(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    condition: &WaitCondition,
    wait_tier: WaitTier,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    let timeout = primitives.tiers().duration(wait_tier);

    info!(
        action_id = %ctx.action_id,
        condition = ?condition,
        timeout_ms = timeout.as_millis() as u64,
        "Executing wait primitive"
    );

    match condition {
        WaitCondition::Visible(control) => {
            let context = primitives.resolve_context(ctx).await?;
            let context_ref: &ResolvedExecutionContext = &context;
            let (_, token) = anchor_selector(control);
            let token_ref = token.as_deref();
            poll_until(timeout, move || async move {
                let probe = primitives.probe_in(context_ref, control, token_ref).await?;
                Ok::<_, ActionError>(probe.is_visible().then_some(()))
            })
            .await?
            .ok_or_else(|| {
                ActionError::WaitTimeout(format!(
                    "{control} not visible after {}ms",
                    timeout.as_millis()
                ))
            })?;
        }
        WaitCondition::Hidden(control) => {
            let context = primitives.resolve_context(ctx).await?;
            let context_ref: &ResolvedExecutionContext = &context;
            poll_until(timeout, move || async move {
                let probe = primitives.probe_in(context_ref, control, None).await?;
                Ok::<_, ActionError>((!probe.is_visible()).then_some(()))
            })
            .await?
            .ok_or_else(|| {
                ActionError::WaitTimeout(format!(
                    "{control} still visible after {}ms",
                    timeout.as_millis()
                ))
            })?;
        }
        WaitCondition::UrlContains(fragment) => {
            let context = primitives.main_context(ctx).await?;
            let page = context.page;
            let fragment_ref = fragment.as_str();
            poll_until(timeout, move || async move {
                let url = primitives
                    .adapter()
                    .current_url(page)
                    .await
                    .map_err(|err| ActionError::from_adapter(err, "location"))?;
                Ok::<_, ActionError>(url.contains(fragment_ref).then_some(()))
            })
            .await?
            .ok_or_else(|| {
                ActionError::WaitTimeout(format!(
                    "url never contained '{fragment}' within {}ms",
                    timeout.as_millis()
                ))
            })?;
        }
        WaitCondition::Duration(ms) => {
            debug!("Sleeping for {}ms", ms);
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
    }

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    debug!(action_id = %ctx.action_id, latency_ms, "Wait condition satisfied");
    Ok(ActionReport::success(started_at, latency_ms))
}
