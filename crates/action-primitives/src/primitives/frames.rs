//! Dialog discovery and frame switching

use crate::{
    errors::ActionError,
    locator::{frame_check_script, DIALOGS_SCRIPT},
    primitives::DefaultActionPrimitives,
    types::{DialogProbe, ExecCtx},
};
use cdp_adapter::Cdp;
use tracing::debug;

pub async fn execute_visible_dialogs(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
) -> Result<Vec<DialogProbe>, ActionError> {
    let context = primitives.main_context(ctx).await?;
    let value = primitives
        .adapter()
        .evaluate_script_in_context(&context, DIALOGS_SCRIPT)
        .await
        .map_err(|err| ActionError::from_adapter(err, "dialogs"))?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|err| ActionError::Internal(format!("malformed dialog list: {err}")))
}

/// Switches subsequent lookups into the frame, after checking it is reachable.
pub async fn execute_enter_frame(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    frame_selector: &str,
) -> Result<(), ActionError> {
    let context = primitives.main_context(ctx).await?;
    let reachable = primitives
        .adapter()
        .evaluate_script_in_context(&context, &frame_check_script(frame_selector)?)
        .await
        .map_err(|err| ActionError::from_adapter(err, frame_selector))?
        .as_bool()
        .unwrap_or(false);
    if !reachable {
        return Err(ActionError::FrameUnavailable(frame_selector.to_string()));
    }
    debug!(action_id = %ctx.action_id, frame = %frame_selector, "Entered frame");
    primitives.set_frame(Some(frame_selector.to_string()));
    Ok(())
}

/// Returns lookups to the top document and confirms it still answers.
pub async fn execute_leave_frame(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
) -> Result<(), ActionError> {
    primitives.set_frame(None);
    let context = primitives.main_context(ctx).await?;
    primitives
        .adapter()
        .evaluate_script_in_context(&context, "document.readyState")
        .await
        .map_err(|err| ActionError::from_adapter(err, "top document"))?;
    debug!(action_id = %ctx.action_id, "Returned to top document");
    Ok(())
}
