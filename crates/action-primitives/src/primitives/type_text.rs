//! Typing and key primitives

use crate::{
    descriptor::ControlDescriptor,
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, Key, TypeMode, WaitTier},
};
use cdp_adapter::{Cdp, KeyStroke, PageId};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Replaces the control's content.
///
/// Both modes focus the control and clear it with select-all + delete. Bulk
/// inserts the text in one `Input.insertText`; paced sends a keystroke per
/// character so widgets that react to key events (autocomplete) see each one.
pub async fn execute_type_text(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    control: &ControlDescriptor,
    text: &str,
    mode: TypeMode,
    wait_tier: WaitTier,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        control = %control,
        text_length = text.chars().count(),
        mode = ?mode,
        "Executing type_text primitive"
    );

    let timeout = primitives.tiers().duration(wait_tier);
    let resolved = primitives.locate(ctx, control, timeout, true).await?;
    let remaining = timeout.saturating_sub(start_instant.elapsed());
    let adapter = primitives.adapter();
    let page = resolved.context.page;

    adapter
        .focus_in_context(&resolved.context, &resolved.selector, remaining)
        .await
        .map_err(|err| ActionError::from_adapter(err, &resolved.selector))?;
    send(primitives, page, &KeyStroke::select_all()).await?;
    send(primitives, page, &KeyStroke::delete()).await?;

    match mode {
        TypeMode::Bulk { confirm } => {
            if !text.is_empty() {
                debug!("Inserting text in bulk");
                adapter
                    .type_text_in_context(&resolved.context, &resolved.selector, text, remaining)
                    .await
                    .map_err(|err| ActionError::from_adapter(err, &resolved.selector))?;
            }
            if let Some(key) = confirm {
                send(primitives, page, &key.stroke()).await?;
            }
        }
        TypeMode::Paced {
            char_delay_ms,
            confirm,
        } => {
            debug!(char_delay_ms, "Typing character by character");
            for ch in text.chars() {
                send(primitives, page, &KeyStroke::character(ch)).await?;
                tokio::time::sleep(Duration::from_millis(char_delay_ms)).await;
            }
            if let Some(key) = confirm {
                send(primitives, page, &key.stroke()).await?;
            }
        }
    }

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        "Type text completed successfully"
    );
    Ok(ActionReport::success(started_at, latency_ms))
}

pub async fn execute_press_key(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    key: Key,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    debug!(action_id = %ctx.action_id, key = ?key, "Executing press_key primitive");

    let context = primitives.resolve_context(ctx).await?;
    send(primitives, context.page, &key.stroke()).await?;
    Ok(ActionReport::success(
        started_at,
        start_instant.elapsed().as_millis() as u64,
    ))
}

async fn send(
    primitives: &DefaultActionPrimitives,
    page: PageId,
    stroke: &KeyStroke,
) -> Result<(), ActionError> {
    primitives
        .adapter()
        .press_key(page, stroke)
        .await
        .map_err(|err| ActionError::from_adapter(err, &stroke.key))
}
