//! Scripted value assignment and file upload

use crate::{
    descriptor::ControlDescriptor,
    errors::ActionError,
    locator::{script_status, set_value_script},
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, WaitTier},
};
use cdp_adapter::Cdp;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Assigns `value` through the element's value setter and fires input/change,
/// for masked inputs that swallow synthetic keystrokes.
pub async fn execute_set_value(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    control: &ControlDescriptor,
    value: &str,
    wait_tier: WaitTier,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        control = %control,
        "Executing set_value primitive"
    );

    let timeout = primitives.tiers().duration(wait_tier);
    let resolved = primitives.locate(ctx, control, timeout, false).await?;
    let target = ControlDescriptor::css(resolved.selector.clone());
    let script = set_value_script(&resolved.context.query_scope(), &target, value)?;
    let outcome = primitives
        .adapter()
        .evaluate_script_in_context(&resolved.context, &script)
        .await
        .map_err(|err| ActionError::from_adapter(err, &resolved.selector))?;
    if script_status(&outcome) != "ok" {
        return Err(ActionError::AnchorNotFound(format!(
            "{control} detached before value assignment"
        )));
    }

    Ok(ActionReport::success(
        started_at,
        start_instant.elapsed().as_millis() as u64,
    ))
}

/// Hands `path` to the file input as is; whether it exists is for the page to decide.
pub async fn execute_upload(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    control: &ControlDescriptor,
    path: &Path,
    wait_tier: WaitTier,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        control = %control,
        path = %path.display(),
        "Executing upload primitive"
    );

    let timeout = primitives.tiers().duration(wait_tier);
    let resolved = primitives.locate(ctx, control, timeout, false).await?;
    let remaining = timeout.saturating_sub(start_instant.elapsed());
    primitives
        .adapter()
        .set_file_input_files(
            &resolved.context,
            &resolved.selector,
            &[path.to_path_buf()],
            remaining,
        )
        .await
        .map_err(|err| ActionError::from_adapter(err, &resolved.selector))?;

    Ok(ActionReport::success(
        started_at,
        start_instant.elapsed().as_millis() as u64,
    ))
}
