//! Action primitives implementation
//!
//! The operations the resolvers and the row workflow are built from:
//! navigate, bounded waits, probes, clicks, typing, keys, scripted value
//! assignment, uploads and frame switching.

mod click;
mod frames;
mod navigate;
mod scroll;
mod type_text;
mod value;
mod wait;

use async_trait::async_trait;
use casefill_core_types::ExecRoute;
use cdp_adapter::{Cdp, CdpAdapter, ResolvedExecutionContext};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::{
    descriptor::ControlDescriptor,
    errors::ActionError,
    locator::{anchor_selector, probe_script, script_status, ResolvedSelector},
    types::{
        ActionReport, ClickPolicy, DialogProbe, ElementProbe, ExecCtx, Key, TypeMode,
        WaitCondition, WaitTier,
    },
    waiting::{poll_until, WaitTiers},
};

/// Operations over the live page.
///
/// Frame state is part of the session: after `enter_frame` every control
/// lookup runs inside that frame until `leave_frame`.
#[async_trait]
pub trait ActionPrimitives: Send + Sync {
    /// Navigate to a URL and wait for the document
    async fn navigate(
        &self,
        ctx: &ExecCtx,
        url: &str,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError>;

    async fn current_url(&self, ctx: &ExecCtx) -> Result<String, ActionError>;

    /// Poll `condition` until it holds or the tier elapses
    async fn wait_for(
        &self,
        ctx: &ExecCtx,
        condition: &WaitCondition,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError>;

    /// Immediate snapshot; `found` is false when the control is absent.
    async fn probe(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
    ) -> Result<ElementProbe, ActionError>;

    async fn scroll_into_view(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError>;

    async fn click(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        policy: ClickPolicy,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError>;

    /// Replace the control's content with `text`
    async fn type_text(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        text: &str,
        mode: TypeMode,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError>;

    /// Key press delivered to whatever holds focus
    async fn press_key(&self, ctx: &ExecCtx, key: Key) -> Result<ActionReport, ActionError>;

    /// Scripted assignment followed by synthesized input/change events
    async fn set_value(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        value: &str,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError>;

    async fn upload_file(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        path: &Path,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError>;

    /// Visible dialogs on the top document that embed a frame
    async fn visible_dialogs(&self, ctx: &ExecCtx) -> Result<Vec<DialogProbe>, ActionError>;

    async fn enter_frame(&self, ctx: &ExecCtx, frame_selector: &str) -> Result<(), ActionError>;

    async fn leave_frame(&self, ctx: &ExecCtx) -> Result<(), ActionError>;

    fn current_frame(&self) -> Option<String>;

    /// Fails with `SessionLost` when the page no longer answers
    async fn ping(&self, ctx: &ExecCtx) -> Result<(), ActionError>;

    /// Fixed pause between steps.
    async fn settle(&self, ms: u64) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

/// Default implementation of action primitives
pub struct DefaultActionPrimitives {
    /// CDP adapter for browser communication
    adapter: Arc<CdpAdapter>,

    /// Timeouts for each wait tier
    tiers: WaitTiers,

    /// Tracks adapter start state
    adapter_ready: OnceCell<()>,

    /// Cached execution contexts per route (session/page/frame)
    route_contexts: DashMap<String, Arc<ResolvedExecutionContext>>,

    /// Selector of the entered frame, if any
    frame: Mutex<Option<String>>,
}

impl DefaultActionPrimitives {
    pub fn new(adapter: Arc<CdpAdapter>, tiers: WaitTiers) -> Self {
        Self {
            adapter,
            tiers,
            adapter_ready: OnceCell::new(),
            route_contexts: DashMap::new(),
            frame: Mutex::new(None),
        }
    }

    /// Get reference to CDP adapter
    pub fn adapter(&self) -> &Arc<CdpAdapter> {
        &self.adapter
    }

    pub fn tiers(&self) -> &WaitTiers {
        &self.tiers
    }

    /// Ensure the underlying adapter is started
    pub async fn ensure_adapter_ready(&self) -> Result<(), ActionError> {
        self.adapter_ready
            .get_or_try_init(|| async {
                self.adapter.start().await.map_err(|err| {
                    ActionError::SessionLost(format!("Failed to start CDP adapter: {}", err))
                })
            })
            .await
            .map(|_| ())
    }

    fn context_cache_key(route: &ExecRoute) -> String {
        format!("{}::{}::{}", route.session.0, route.page.0, route.frame.0)
    }

    fn cleanup_context_cache(&self) {
        let active_pages: HashSet<cdp_adapter::PageId> =
            self.adapter.pages().into_iter().collect();

        if active_pages.is_empty() {
            return;
        }

        self.route_contexts
            .retain(|_, ctx| active_pages.contains(&ctx.page));
    }

    pub async fn resolve_route_context(
        &self,
        route: &ExecRoute,
    ) -> Result<Arc<ResolvedExecutionContext>, ActionError> {
        let key = Self::context_cache_key(route);
        if let Some(existing) = self.route_contexts.get(&key) {
            return Ok(existing.value().clone());
        }

        self.ensure_adapter_ready().await?;
        self.cleanup_context_cache();

        let resolved = self
            .adapter
            .resolve_execution_context(route)
            .await
            .map_err(|err| ActionError::SessionLost(err.to_string()))?;
        let context = Arc::new(resolved);
        self.route_contexts.insert(key, context.clone());
        Ok(context)
    }

    /// Context for the current frame state.
    pub async fn resolve_context(
        &self,
        ctx: &ExecCtx,
    ) -> Result<Arc<ResolvedExecutionContext>, ActionError> {
        let frame = self.frame.lock().clone();
        let route = match frame {
            Some(selector) => ctx.route.with_frame_selector(&selector),
            None => ctx.route.to_main_frame(),
        };
        self.resolve_route_context(&route).await
    }

    /// Context for the top document regardless of frame state.
    pub async fn main_context(
        &self,
        ctx: &ExecCtx,
    ) -> Result<Arc<ResolvedExecutionContext>, ActionError> {
        self.resolve_route_context(&ctx.route.to_main_frame()).await
    }

    async fn probe_in(
        &self,
        context: &ResolvedExecutionContext,
        control: &ControlDescriptor,
        token: Option<&str>,
    ) -> Result<ElementProbe, ActionError> {
        let script = probe_script(&context.query_scope(), control, token)?;
        let value = self
            .adapter
            .evaluate_script_in_context(context, &script)
            .await
            .map_err(|err| ActionError::from_adapter(err, &control.to_string()))?;
        if script_status(&value) != "ok" {
            return Ok(ElementProbe::missing());
        }
        let probe = value.get("probe").cloned().unwrap_or_default();
        serde_json::from_value(probe)
            .map_err(|err| ActionError::Internal(format!("malformed probe result: {err}")))
    }

    /// Poll until `control` is present (and rendered when `visible`), returning
    /// a selector native commands can use.
    pub async fn locate(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        timeout: Duration,
        visible: bool,
    ) -> Result<ResolvedSelector, ActionError> {
        let context = self.resolve_context(ctx).await?;
        let (selector, token) = anchor_selector(control);
        let context_ref: &ResolvedExecutionContext = &context;
        let token_ref = token.as_deref();

        let ready = poll_until(timeout, move || async move {
            let probe = self.probe_in(context_ref, control, token_ref).await?;
            Ok::<_, ActionError>((probe.found && (!visible || probe.visible)).then_some(()))
        })
        .await?;

        match ready {
            Some(()) => Ok(ResolvedSelector::new(selector, context)),
            None => {
                let last = self.probe_in(&context, control, token_ref).await?;
                if last.found {
                    Err(ActionError::NotClickable(format!(
                        "{control} present but not visible after {}ms",
                        timeout.as_millis()
                    )))
                } else {
                    Err(ActionError::AnchorNotFound(format!(
                        "{control} not found after {}ms",
                        timeout.as_millis()
                    )))
                }
            }
        }
    }

    fn set_frame(&self, frame: Option<String>) {
        *self.frame.lock() = frame;
    }
}

#[async_trait]
impl ActionPrimitives for DefaultActionPrimitives {
    async fn navigate(
        &self,
        ctx: &ExecCtx,
        url: &str,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        navigate::execute_navigate(self, ctx, url, wait_tier).await
    }

    async fn current_url(&self, ctx: &ExecCtx) -> Result<String, ActionError> {
        navigate::execute_current_url(self, ctx).await
    }

    async fn wait_for(
        &self,
        ctx: &ExecCtx,
        condition: &WaitCondition,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        wait::execute_wait(self, ctx, condition, wait_tier).await
    }

    async fn probe(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
    ) -> Result<ElementProbe, ActionError> {
        let context = self.resolve_context(ctx).await?;
        self.probe_in(&context, control, None).await
    }

    async fn scroll_into_view(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        scroll::execute_scroll_into_view(self, ctx, control, wait_tier).await
    }

    async fn click(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        policy: ClickPolicy,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        click::execute_click(self, ctx, control, policy, wait_tier).await
    }

    async fn type_text(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        text: &str,
        mode: TypeMode,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        type_text::execute_type_text(self, ctx, control, text, mode, wait_tier).await
    }

    async fn press_key(&self, ctx: &ExecCtx, key: Key) -> Result<ActionReport, ActionError> {
        type_text::execute_press_key(self, ctx, key).await
    }

    async fn set_value(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        value: &str,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        value::execute_set_value(self, ctx, control, value, wait_tier).await
    }

    async fn upload_file(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        path: &Path,
        wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        value::execute_upload(self, ctx, control, path, wait_tier).await
    }

    async fn visible_dialogs(&self, ctx: &ExecCtx) -> Result<Vec<DialogProbe>, ActionError> {
        frames::execute_visible_dialogs(self, ctx).await
    }

    async fn enter_frame(&self, ctx: &ExecCtx, frame_selector: &str) -> Result<(), ActionError> {
        frames::execute_enter_frame(self, ctx, frame_selector).await
    }

    async fn leave_frame(&self, ctx: &ExecCtx) -> Result<(), ActionError> {
        frames::execute_leave_frame(self, ctx).await
    }

    fn current_frame(&self) -> Option<String> {
        self.frame.lock().clone()
    }

    async fn ping(&self, ctx: &ExecCtx) -> Result<(), ActionError> {
        navigate::execute_ping(self, ctx).await
    }
}
