//! Scroll primitive - bring a control to the centre of its viewport

use crate::{
    descriptor::ControlDescriptor,
    errors::ActionError,
    locator::{script_status, scroll_script},
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, WaitTier},
};
use cdp_adapter::Cdp;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

pub async fn execute_scroll_into_view(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    control: &ControlDescriptor,
    wait_tier: WaitTier,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        control = %control,
        "Executing scroll primitive"
    );

    let timeout = primitives.tiers().duration(wait_tier);
    let resolved = primitives.locate(ctx, control, timeout, false).await?;
    let target = ControlDescriptor::css(resolved.selector.clone());
    let script = scroll_script(&resolved.context.query_scope(), &target)?;

    debug!(selector = %resolved.selector, "Scrolling element into view");
    let value = primitives
        .adapter()
        .evaluate_script_in_context(&resolved.context, &script)
        .await
        .map_err(|err| ActionError::from_adapter(err, &resolved.selector))?;
    if script_status(&value) != "ok" {
        return Err(ActionError::AnchorNotFound(format!(
            "{control} detached before scrolling"
        )));
    }

    Ok(ActionReport::success(
        started_at,
        start_instant.elapsed().as_millis() as u64,
    ))
}
