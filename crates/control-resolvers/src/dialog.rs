//! Dialog sessions: a modal whose form lives in an embedded frame.
//!
//! The frame is entered after the dialog shows up and is always left before
//! [`Resolvers::dialog_session`] returns, whatever happened inside.

use action_primitives::{
    ClickPolicy, ControlDescriptor, DialogProbe, ExecCtx, WaitCondition, WaitTier,
};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::api::Resolvers;
use crate::errors::ResolveError;

/// A field inside the dialog's frame, set by scripted assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogField {
    pub control: ControlDescriptor,
    pub value: String,
}

/// A button inside the dialog's frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogButton {
    pub name: String,
    pub primary: ControlDescriptor,
    pub fallback: Option<ControlDescriptor>,
    /// Wait for the primary to become visible before considering the fallback.
    pub await_visible: bool,
}

impl DialogButton {
    pub fn new(name: impl Into<String>, primary: ControlDescriptor) -> Self {
        Self {
            name: name.into(),
            primary,
            fallback: None,
            await_visible: false,
        }
    }

    pub fn or(mut self, fallback: ControlDescriptor) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn awaited(mut self) -> Self {
        self.await_visible = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSpec {
    pub opener: ControlDescriptor,
    /// Fragment of the dialog id to prefer among visible dialogs.
    pub hint: String,
    pub fields: Vec<DialogField>,
    /// Activated in order once the fields are set.
    pub buttons: Vec<DialogButton>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogOutcome {
    pub dialog_id: String,
    /// False when the dialog was still visible after the long wait.
    pub closed: bool,
}

/// Dialog whose id contains `hint`, else the first one.
pub fn pick_dialog(dialogs: &[DialogProbe], hint: &str) -> Option<DialogProbe> {
    dialogs
        .iter()
        .find(|dialog| !hint.is_empty() && dialog.id.contains(hint))
        .or_else(|| dialogs.first())
        .cloned()
}

impl Resolvers {
    #[instrument(skip_all, fields(action = %ctx.action_id, hint = %spec.hint))]
    pub async fn dialog_session(
        &self,
        ctx: &ExecCtx,
        spec: &DialogSpec,
    ) -> Result<DialogOutcome, ResolveError> {
        let p = self.primitives.as_ref();
        info!(opener = %spec.opener, "Opening dialog");
        p.click(ctx, &spec.opener, ClickPolicy::NativeThenScript, WaitTier::Short)
            .await?;

        let dialog = self.await_dialog(ctx, &spec.hint).await?;
        debug!(dialog = %dialog.id, frame = %dialog.frame_selector, "Entering dialog frame");
        p.enter_frame(ctx, &dialog.frame_selector).await?;

        let inside = self.populate(ctx, spec).await;
        let left = p.leave_frame(ctx).await;
        inside.map_err(|err| ResolveError::InDialog {
            dialog: dialog.id.clone(),
            source: Box::new(err),
        })?;
        left?;

        let closed = self.await_teardown(ctx, &dialog).await?;
        if closed {
            info!(dialog = %dialog.id, "Dialog closed");
        } else {
            warn!(dialog = %dialog.id, "Dialog still visible, proceeding");
        }
        Ok(DialogOutcome {
            dialog_id: dialog.id,
            closed,
        })
    }

    async fn await_dialog(&self, ctx: &ExecCtx, hint: &str) -> Result<DialogProbe, ResolveError> {
        let p = self.primitives.as_ref();
        let deadline = Instant::now() + self.tiers.duration(WaitTier::Long);
        loop {
            let dialogs = p.visible_dialogs(ctx).await?;
            if let Some(dialog) = pick_dialog(&dialogs, hint) {
                return Ok(dialog);
            }
            if Instant::now() >= deadline {
                return Err(ResolveError::DialogMissing {
                    hint: hint.to_string(),
                });
            }
            p.settle(self.tempo.dialog_poll_ms.max(10)).await;
        }
    }

    async fn populate(&self, ctx: &ExecCtx, spec: &DialogSpec) -> Result<(), ResolveError> {
        let p = self.primitives.as_ref();
        for field in &spec.fields {
            p.wait_for(ctx, &WaitCondition::Visible(field.control.clone()), WaitTier::Long)
                .await?;
            p.set_value(ctx, &field.control, &field.value, WaitTier::Short)
                .await?;
        }
        p.settle(self.tempo.post_click_ms).await;

        for button in &spec.buttons {
            let target = self.resolve_button(ctx, button).await?;
            debug!(button = %button.name, control = %target, "Activating dialog button");
            p.click(ctx, &target, ClickPolicy::NativeThenScript, WaitTier::Short)
                .await?;
            p.settle(self.tempo.post_click_ms).await;
        }
        Ok(())
    }

    async fn resolve_button(
        &self,
        ctx: &ExecCtx,
        button: &DialogButton,
    ) -> Result<ControlDescriptor, ResolveError> {
        let p = self.primitives.as_ref();
        let primary_ready = if button.await_visible {
            p.wait_for(ctx, &WaitCondition::Visible(button.primary.clone()), WaitTier::Long)
                .await
                .is_ok()
        } else {
            p.probe(ctx, &button.primary).await?.found
        };
        if primary_ready {
            return Ok(button.primary.clone());
        }
        if let Some(fallback) = &button.fallback {
            if p.probe(ctx, fallback).await?.found {
                debug!(button = %button.name, "Using fallback button");
                return Ok(fallback.clone());
            }
        }
        Err(ResolveError::ButtonMissing {
            name: button.name.clone(),
        })
    }

    async fn await_teardown(&self, ctx: &ExecCtx, dialog: &DialogProbe) -> Result<bool, ResolveError> {
        let p = self.primitives.as_ref();
        if !dialog.id.is_empty() {
            let hidden = WaitCondition::Hidden(ControlDescriptor::id(&dialog.id));
            return Ok(p.wait_for(ctx, &hidden, WaitTier::Long).await.is_ok());
        }
        let deadline = Instant::now() + self.tiers.duration(WaitTier::Long);
        loop {
            let dialogs = p.visible_dialogs(ctx).await?;
            if !dialogs
                .iter()
                .any(|open| open.frame_selector == dialog.frame_selector)
            {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            p.settle(self.tempo.dialog_poll_ms.max(10)).await;
        }
    }
}
