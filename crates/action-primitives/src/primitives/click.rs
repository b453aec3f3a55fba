//! Click primitive - native mouse path with a forced script fallback

use crate::{
    descriptor::ControlDescriptor,
    errors::ActionError,
    locator::ResolvedSelector,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ClickPolicy, ExecCtx, WaitTier},
};
use cdp_adapter::{AdapterErrorKind, Cdp};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Clicks the control once it is present.
///
/// With [`ClickPolicy::NativeThenScript`] the element is scrolled into view and
/// clicked with mouse events once visible and enabled. When that path is
/// blocked (hidden, disabled, covered by an overlay) the click is re-issued
/// through `HTMLElement.click()`. A control that never appears is an error
/// either way.
pub async fn execute_click(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    control: &ControlDescriptor,
    policy: ClickPolicy,
    wait_tier: WaitTier,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        control = %control,
        policy = ?policy,
        wait_tier = ?wait_tier,
        "Executing click primitive"
    );

    let timeout = primitives.tiers().duration(wait_tier);
    let resolved = primitives.locate(ctx, control, timeout, false).await?;
    let remaining = timeout.saturating_sub(start_instant.elapsed());

    let fallback = match policy {
        ClickPolicy::ScriptOnly => {
            script_click(primitives, &resolved, remaining).await?;
            None
        }
        ClickPolicy::NativeThenScript => {
            debug!(selector = %resolved.selector, "Executing CDP click");
            match primitives
                .adapter()
                .click_in_context(&resolved.context, &resolved.selector, remaining)
                .await
            {
                Ok(()) => None,
                Err(err) if err.kind == AdapterErrorKind::TargetNotFound => {
                    return Err(ActionError::from_adapter(err, &resolved.selector));
                }
                Err(err) => {
                    warn!(
                        action_id = %ctx.action_id,
                        control = %control,
                        error = %err,
                        "Native click blocked, forcing script click"
                    );
                    script_click(primitives, &resolved, remaining).await?;
                    Some("script-click")
                }
            }
        }
    };

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        fallback = ?fallback,
        "Click completed successfully"
    );

    let report = ActionReport::success(started_at, latency_ms);
    Ok(match fallback {
        Some(kind) => report.with_fallback(kind),
        None => report,
    })
}

async fn script_click(
    primitives: &DefaultActionPrimitives,
    resolved: &ResolvedSelector,
    deadline: Duration,
) -> Result<(), ActionError> {
    primitives
        .adapter()
        .script_click_in_context(&resolved.context, &resolved.selector, deadline)
        .await
        .map_err(|err| ActionError::from_adapter(err, &resolved.selector))
}
