//! The single browser tab a run works in, and the commands the primitives send to it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use casefill_core_types::ExecRoute;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::dom::{
    anchors_script, element_handle, element_script, returned_value, Anchor, ElementAction,
    QueryScope,
};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::launch::{locate_chrome, CdpConfig};
use crate::transport::{CdpTransport, ChromiumTransport, CommandTarget};
use crate::KeyStroke;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Adapter-side handle of an attached tab.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl PageId {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Page plus the frame a command should run in.
#[derive(Clone, Debug)]
pub struct ResolvedExecutionContext {
    pub page: PageId,
    pub frame_selector: Option<String>,
}

impl ResolvedExecutionContext {
    pub fn for_page(page: PageId) -> Self {
        Self {
            page,
            frame_selector: None,
        }
    }

    pub fn with_frame(page: PageId, frame_selector: Option<String>) -> Self {
        Self {
            page,
            frame_selector: frame_selector.filter(|selector| !selector.is_empty()),
        }
    }

    pub fn query_scope(&self) -> QueryScope {
        match &self.frame_selector {
            Some(selector) => QueryScope::Frame(selector.clone()),
            None => QueryScope::Document,
        }
    }
}

/// Browser commands the interaction primitives are written against.
#[async_trait]
pub trait Cdp: Send + Sync {
    async fn navigate(&self, page: PageId, url: &str, deadline: Duration)
        -> Result<(), AdapterError>;
    async fn current_url(&self, page: PageId) -> Result<String, AdapterError>;
    async fn query_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
    ) -> Result<Vec<Anchor>, AdapterError>;
    /// Native mouse click at the element centre once it is visible and enabled.
    async fn click_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError>;
    /// `HTMLElement.click()` through script, ignoring overlays and hit testing.
    async fn script_click_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError>;
    async fn focus_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError>;
    async fn type_text_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        text: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError>;
    /// Delivers a key to whatever holds focus on the page.
    async fn press_key(&self, page: PageId, stroke: &KeyStroke) -> Result<(), AdapterError>;
    async fn evaluate_script(&self, page: PageId, expression: &str)
        -> Result<Value, AdapterError>;
    async fn evaluate_script_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        expression: &str,
    ) -> Result<Value, AdapterError>;
    async fn set_file_input_files(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        files: &[PathBuf],
        deadline: Duration,
    ) -> Result<(), AdapterError>;
}

pub struct CdpAdapter {
    cfg: CdpConfig,
    transport: Arc<dyn CdpTransport>,
    /// Attached tabs and their flattened CDP session ids.
    pages: DashMap<PageId, String>,
    /// Execution routes already bound to a tab.
    routes: DashMap<String, PageId>,
}

impl CdpAdapter {
    /// Adapter over a real Chrome. Fails early when there is neither a
    /// websocket URL to attach to nor a Chrome binary to launch.
    pub fn new(mut cfg: CdpConfig) -> Result<Self, AdapterError> {
        if cfg.websocket_url.is_none() {
            let chrome = locate_chrome(cfg.executable.as_deref()).ok_or_else(|| {
                AdapterError::io("Chrome/Chromium executable not found")
                    .with_data(json!({ "remediation": "set browser.executable or CASEFILL_CHROME, or pass --ws-url" }))
            })?;
            cfg.executable = Some(chrome);
        }
        let transport = Arc::new(ChromiumTransport::new(cfg.clone()));
        Ok(Self::with_transport(cfg, transport))
    }

    pub fn with_transport(cfg: CdpConfig, transport: Arc<dyn CdpTransport>) -> Self {
        Self {
            cfg,
            transport,
            pages: DashMap::new(),
            routes: DashMap::new(),
        }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.cfg
    }

    /// Records a tab reachable through `cdp_session`.
    pub fn register_page(&self, page: PageId, cdp_session: impl Into<String>) {
        self.pages.insert(page, cdp_session.into());
    }

    pub fn pages(&self) -> Vec<PageId> {
        let mut pages: Vec<PageId> = self.pages.iter().map(|entry| *entry.key()).collect();
        pages.sort();
        pages
    }

    /// Attaches to the first ordinary tab of the browser, opening one when
    /// there is none. A no-op once a tab is attached.
    pub async fn start(&self) -> Result<(), AdapterError> {
        if !self.pages.is_empty() {
            return Ok(());
        }
        let tab = match self.existing_tab().await? {
            Some(tab) => tab,
            None => self.open_tab().await?,
        };
        let attached = self
            .browser_command(
                "Target.attachToTarget",
                json!({ "targetId": tab, "flatten": true }),
            )
            .await?;
        let session = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::internal("attachToTarget returned no sessionId"))?;
        let page = PageId::new();
        self.register_page(page, session);
        info!(target: "cdp-adapter", %tab, ?page, "attached to tab");
        Ok(())
    }

    async fn existing_tab(&self) -> Result<Option<String>, AdapterError> {
        let listing = self.browser_command("Target.getTargets", json!({})).await?;
        let tab = listing
            .get("targetInfos")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|info| {
                info.get("type").and_then(Value::as_str) == Some("page")
                    && !info
                        .get("url")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .starts_with("devtools://")
            })
            .and_then(|info| info.get("targetId").and_then(Value::as_str))
            .map(str::to_string);
        Ok(tab)
    }

    async fn open_tab(&self) -> Result<String, AdapterError> {
        let created = self
            .browser_command("Target.createTarget", json!({ "url": "about:blank" }))
            .await?;
        created
            .get("targetId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AdapterError::internal("createTarget returned no targetId"))
    }

    /// Binds the route to an attached tab; every route of a run shares the
    /// operator's tab.
    pub async fn resolve_execution_context(
        &self,
        route: &ExecRoute,
    ) -> Result<ResolvedExecutionContext, AdapterError> {
        let key = route.page.0.clone();
        let page = match self.routes.get(&key).map(|entry| *entry.value()) {
            Some(page) if self.pages.contains_key(&page) => page,
            _ => {
                let page = self.pages().into_iter().next().ok_or_else(|| {
                    AdapterError::internal("no browser tab attached; start the adapter first")
                })?;
                debug!(target: "cdp-adapter", route = %key, ?page, "route bound to tab");
                self.routes.insert(key, page);
                page
            }
        };
        Ok(ResolvedExecutionContext::with_frame(
            page,
            route.frame.selector().map(str::to_string),
        ))
    }

    pub async fn shutdown(&self) {
        self.routes.clear();
        self.pages.clear();
        self.transport.close().await;
    }

    async fn browser_command(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        self.transport
            .send_command(CommandTarget::Browser, method, params)
            .await
    }

    async fn page_command(
        &self,
        page: PageId,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let session = self
            .pages
            .get(&page)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AdapterError::io(format!("tab {page:?} is no longer attached")))?;
        let started = Instant::now();
        let result = self
            .transport
            .send_command(CommandTarget::Session(session), method, params)
            .await;
        debug!(
            target: "cdp-adapter",
            method,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "page command"
        );
        result
    }

    /// Runs an element script until it stops reporting `not-found`.
    async fn on_element(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        action: ElementAction,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        let script = element_script(&ctx.query_scope(), selector, action)?;
        let give_up = Instant::now() + deadline;
        loop {
            let value = self.evaluate_script_in_context(ctx, &script).await?;
            match value.get("status").and_then(Value::as_str) {
                Some("ok") => return Ok(()),
                Some("not-found") if Instant::now() < give_up => sleep(POLL_INTERVAL).await,
                Some("not-found") => {
                    return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                        .with_hint(format!("'{selector}' not found")))
                }
                other => {
                    return Err(AdapterError::internal(format!(
                        "unexpected script status {other:?} for '{selector}'"
                    )))
                }
            }
        }
    }

    /// First match once it is visible and enabled, scrolled into view.
    async fn clickable_anchor(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        deadline: Duration,
    ) -> Result<Anchor, AdapterError> {
        let give_up = Instant::now() + deadline;
        loop {
            let anchors = self.query_in_context(ctx, selector).await?;
            match anchors.first() {
                Some(anchor) if anchor.clickable() => break,
                _ if Instant::now() < give_up => sleep(POLL_INTERVAL).await,
                Some(_) => {
                    return Err(AdapterError::new(AdapterErrorKind::NotInteractable)
                        .with_hint(format!("'{selector}' is hidden or disabled")))
                }
                None => {
                    return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                        .with_hint(format!("'{selector}' not found")))
                }
            }
        }

        self.on_element(ctx, selector, ElementAction::Scroll, Duration::ZERO)
            .await?;
        self.query_in_context(ctx, selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("'{selector}' went away while scrolling"))
            })
    }

    async fn ready_state(&self, page: PageId) -> Result<bool, AdapterError> {
        let state = self.evaluate_script(page, "document.readyState").await?;
        Ok(matches!(state.as_str(), Some("interactive" | "complete")))
    }
}

fn key_event(kind: &str, stroke: &KeyStroke) -> Value {
    json!({
        "type": kind,
        "key": stroke.key,
        "code": stroke.code,
        "windowsVirtualKeyCode": stroke.key_code,
        "nativeVirtualKeyCode": stroke.key_code,
        "modifiers": stroke.modifiers,
    })
}

#[async_trait]
impl Cdp for CdpAdapter {
    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        let give_up = Instant::now() + deadline;
        let response = self
            .page_command(page, "Page.navigate", json!({ "url": url }))
            .await?;
        if let Some(error) = response
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            return Err(AdapterError::io(format!("navigation to {url} failed: {error}")));
        }
        while !self.ready_state(page).await? {
            if Instant::now() >= give_up {
                return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint(format!("{url} did not finish loading")));
            }
            sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn current_url(&self, page: PageId) -> Result<String, AdapterError> {
        self.evaluate_script(page, "window.location.href")
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AdapterError::internal("location.href is not a string"))
    }

    async fn query_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
    ) -> Result<Vec<Anchor>, AdapterError> {
        let script = anchors_script(&ctx.query_scope(), selector)?;
        match self.evaluate_script_in_context(ctx, &script).await? {
            Value::Array(entries) => entries
                .into_iter()
                .map(|entry| {
                    serde_json::from_value(entry)
                        .map_err(|err| AdapterError::internal(format!("malformed anchor: {err}")))
                })
                .collect(),
            other => Err(AdapterError::internal(format!(
                "anchor query returned {other}"
            ))),
        }
    }

    async fn click_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        let anchor = self.clickable_anchor(ctx, selector, deadline).await?;
        if !anchor.unobstructed {
            return Err(AdapterError::new(AdapterErrorKind::NotInteractable)
                .with_hint(format!("'{selector}' is covered by another element")));
        }
        for phase in ["mousePressed", "mouseReleased"] {
            self.page_command(
                ctx.page,
                "Input.dispatchMouseEvent",
                json!({
                    "type": phase,
                    "x": anchor.x,
                    "y": anchor.y,
                    "button": "left",
                    "clickCount": 1,
                }),
            )
            .await?;
        }
        Ok(())
    }

    async fn script_click_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        self.on_element(ctx, selector, ElementAction::Click, deadline)
            .await
    }

    async fn focus_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        self.on_element(ctx, selector, ElementAction::Focus, deadline)
            .await
    }

    async fn type_text_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        text: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        self.focus_in_context(ctx, selector, deadline).await?;
        self.page_command(ctx.page, "Input.insertText", json!({ "text": text }))
            .await
            .map(|_| ())
    }

    async fn press_key(&self, page: PageId, stroke: &KeyStroke) -> Result<(), AdapterError> {
        // Printable keys need `keyDown` with text; the rest are raw.
        let mut down = key_event(
            if stroke.text.is_some() { "keyDown" } else { "rawKeyDown" },
            stroke,
        );
        if let Some(text) = &stroke.text {
            down["text"] = json!(text);
            down["unmodifiedText"] = json!(text);
        }
        if !stroke.commands.is_empty() {
            down["commands"] = json!(stroke.commands);
        }
        self.page_command(page, "Input.dispatchKeyEvent", down).await?;
        self.page_command(page, "Input.dispatchKeyEvent", key_event("keyUp", stroke))
            .await
            .map(|_| ())
    }

    async fn evaluate_script(&self, page: PageId, expression: &str) -> Result<Value, AdapterError> {
        self.evaluate_script_in_context(&ResolvedExecutionContext::for_page(page), expression)
            .await
    }

    async fn evaluate_script_in_context(
        &self,
        ctx: &ResolvedExecutionContext,
        expression: &str,
    ) -> Result<Value, AdapterError> {
        let response = self
            .page_command(
                ctx.page,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true,
                    "userGesture": true,
                }),
            )
            .await?;
        if let Some(details) = response.get("exceptionDetails") {
            return Err(AdapterError::internal("script raised an exception").with_data(details.clone()));
        }
        Ok(returned_value(&response))
    }

    async fn set_file_input_files(
        &self,
        ctx: &ResolvedExecutionContext,
        selector: &str,
        files: &[PathBuf],
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        let handle = element_handle(&ctx.query_scope(), selector)?;
        let give_up = Instant::now() + deadline;
        let object_id = loop {
            let response = self
                .page_command(
                    ctx.page,
                    "Runtime.evaluate",
                    json!({
                        "expression": handle,
                        "objectGroup": "casefill-upload",
                        "returnByValue": false,
                    }),
                )
                .await?;
            if let Some(id) = response.pointer("/result/objectId").and_then(Value::as_str) {
                break id.to_string();
            }
            if Instant::now() >= give_up {
                return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("file input '{selector}' not found")));
            }
            sleep(POLL_INTERVAL).await;
        };

        let files: Vec<String> = files
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        let result = self
            .page_command(
                ctx.page,
                "DOM.setFileInputFiles",
                json!({ "files": files, "objectId": object_id }),
            )
            .await;
        // The handle is released even when the page rejected the files.
        let _ = self
            .page_command(
                ctx.page,
                "Runtime.releaseObjectGroup",
                json!({ "objectGroup": "casefill-upload" }),
            )
            .await;
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casefill_core_types as core;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Records every command and answers from a queue, `{}` when it runs dry.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(CommandTarget, String, Value)>>,
        answers: Mutex<VecDeque<Value>>,
    }

    impl RecordingTransport {
        fn answer(&self, value: Value) {
            self.answers.lock().push_back(value);
        }

        fn params(&self, method: &str) -> Vec<Value> {
            self.sent
                .lock()
                .iter()
                .filter(|(_, m, _)| m == method)
                .map(|(_, _, params)| params.clone())
                .collect()
        }
    }

    #[async_trait]
    impl CdpTransport for RecordingTransport {
        async fn send_command(
            &self,
            target: CommandTarget,
            method: &str,
            params: Value,
        ) -> Result<Value, AdapterError> {
            self.sent.lock().push((target, method.to_string(), params));
            Ok(self.answers.lock().pop_front().unwrap_or_else(|| json!({})))
        }
    }

    fn adapter() -> (CdpAdapter, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let adapter = CdpAdapter::with_transport(CdpConfig::default(), transport.clone());
        (adapter, transport)
    }

    fn attached() -> (CdpAdapter, Arc<RecordingTransport>, PageId) {
        let (adapter, transport) = adapter();
        let page = PageId::new();
        adapter.register_page(page, "S1");
        (adapter, transport, page)
    }

    fn evaluated(value: Value) -> Value {
        json!({ "result": { "value": value } })
    }

    #[tokio::test]
    async fn start_attaches_to_the_open_tab() {
        let (adapter, transport) = adapter();
        transport.answer(json!({ "targetInfos": [
            { "targetId": "DT", "type": "page", "url": "devtools://devtools/inspector.html" },
            { "targetId": "W", "type": "service_worker", "url": "https://pje.example/sw.js" },
            { "targetId": "T1", "type": "page", "url": "https://pje.example/login" }
        ] }));
        transport.answer(json!({ "sessionId": "S-T1" }));

        adapter.start().await.expect("start");
        adapter.start().await.expect("second start is a no-op");

        let attach = transport.params("Target.attachToTarget");
        assert_eq!(attach, vec![json!({ "targetId": "T1", "flatten": true })]);
        assert!(transport.params("Target.createTarget").is_empty());
        assert_eq!(adapter.pages().len(), 1);
    }

    #[tokio::test]
    async fn start_opens_a_tab_when_none_exists() {
        let (adapter, transport) = adapter();
        transport.answer(json!({ "targetInfos": [] }));
        transport.answer(json!({ "targetId": "NEW" }));
        transport.answer(json!({ "sessionId": "S-NEW" }));

        adapter.start().await.expect("start");

        assert_eq!(transport.params("Target.createTarget").len(), 1);
        assert_eq!(transport.params("Target.attachToTarget")[0]["targetId"], "NEW");
    }

    #[tokio::test]
    async fn routes_share_the_attached_tab_and_keep_their_frame() {
        let (adapter, transport, page) = attached();
        let route = core::ExecRoute::main_frame(core::SessionId::new(), core::PageId::new());

        let main = adapter.resolve_execution_context(&route).await.expect("main");
        let framed = adapter
            .resolve_execution_context(&route.with_frame_selector("[id=\"dlg\"] iframe"))
            .await
            .expect("framed");

        assert_eq!(main.page, page);
        assert_eq!(main.query_scope(), QueryScope::Document);
        assert_eq!(framed.page, page);
        assert_eq!(framed.query_scope(), QueryScope::Frame("[id=\"dlg\"] iframe".into()));

        adapter.evaluate_script(page, "1").await.expect("evaluate");
        let sent = transport.sent.lock();
        assert_eq!(sent[0].0, CommandTarget::Session("S1".into()));
    }

    #[tokio::test]
    async fn unattached_adapter_cannot_resolve_routes() {
        let (adapter, _) = adapter();
        let route = core::ExecRoute::main_frame(core::SessionId::new(), core::PageId::new());
        let err = adapter.resolve_execution_context(&route).await.expect_err("no tab");
        assert_eq!(err.kind, AdapterErrorKind::Internal);
    }

    #[tokio::test]
    async fn navigate_waits_for_ready_state() {
        let (adapter, transport, page) = attached();
        transport.answer(json!({ "frameId": "F1" }));
        transport.answer(evaluated(json!("loading")));
        transport.answer(evaluated(json!("complete")));

        adapter
            .navigate(page, "https://pje.example/login", Duration::from_secs(5))
            .await
            .expect("navigate");

        assert_eq!(transport.params("Page.navigate").len(), 1);
        assert_eq!(transport.params("Runtime.evaluate").len(), 2);
    }

    #[tokio::test]
    async fn navigate_surfaces_error_text() {
        let (adapter, transport, page) = attached();
        transport.answer(json!({ "frameId": "F1", "errorText": "net::ERR_NAME_NOT_RESOLVED" }));

        let err = adapter
            .navigate(page, "https://nowhere.invalid", Duration::from_secs(1))
            .await
            .expect_err("navigation error");
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[tokio::test]
    async fn click_scrolls_then_presses_at_the_new_position() {
        let (adapter, transport, page) = attached();
        transport.answer(evaluated(json!([{ "x": 42.0, "y": 900.0, "visible": true, "enabled": true }])));
        transport.answer(evaluated(json!({ "status": "ok" })));
        transport.answer(evaluated(json!([{ "x": 40.0, "y": 20.0, "visible": true, "enabled": true }])));

        adapter
            .click_in_context(
                &ResolvedExecutionContext::for_page(page),
                "[id=\"btnSalvar\"]",
                Duration::from_secs(2),
            )
            .await
            .expect("click");

        let mouse = transport.params("Input.dispatchMouseEvent");
        assert_eq!(mouse.len(), 2);
        assert_eq!(mouse[0]["type"], "mousePressed");
        assert_eq!(mouse[0]["y"].as_f64(), Some(20.0));
        assert_eq!(mouse[1]["type"], "mouseReleased");
    }

    #[tokio::test]
    async fn covered_target_is_not_clicked() {
        let (adapter, transport, page) = attached();
        let covered = json!([{ "x": 1.0, "y": 1.0, "visible": true, "enabled": true, "unobstructed": false }]);
        transport.answer(evaluated(covered.clone()));
        transport.answer(evaluated(json!({ "status": "ok" })));
        transport.answer(evaluated(covered));

        let err = adapter
            .click_in_context(&ResolvedExecutionContext::for_page(page), "#btnSalvar", Duration::ZERO)
            .await
            .expect_err("mask over the button");
        assert_eq!(err.kind, AdapterErrorKind::NotInteractable);
        assert!(transport.params("Input.dispatchMouseEvent").is_empty());
    }

    #[tokio::test]
    async fn disabled_target_reports_not_interactable_at_deadline() {
        let (adapter, transport, page) = attached();
        transport.answer(evaluated(json!([{ "x": 1.0, "y": 1.0, "visible": true, "enabled": false }])));

        let err = adapter
            .click_in_context(&ResolvedExecutionContext::for_page(page), "#locked", Duration::ZERO)
            .await
            .expect_err("disabled");
        assert_eq!(err.kind, AdapterErrorKind::NotInteractable);
    }

    #[tokio::test]
    async fn missing_script_target_is_not_found() {
        let (adapter, transport, page) = attached();
        transport.answer(evaluated(json!({ "status": "not-found" })));

        let err = adapter
            .script_click_in_context(&ResolvedExecutionContext::for_page(page), "#gone", Duration::ZERO)
            .await
            .expect_err("absent");
        assert_eq!(err.kind, AdapterErrorKind::TargetNotFound);
    }

    #[tokio::test]
    async fn type_text_focuses_then_inserts() {
        let (adapter, transport, page) = attached();
        transport.answer(evaluated(json!({ "status": "ok" })));

        adapter
            .type_text_in_context(
                &ResolvedExecutionContext::for_page(page),
                "#search",
                "12/03/2024",
                Duration::from_secs(2),
            )
            .await
            .expect("type");

        let focus = transport.params("Runtime.evaluate");
        assert!(focus[0]["expression"]
            .as_str()
            .unwrap_or_default()
            .starts_with("/*casefill:focus*/"));
        assert_eq!(transport.params("Input.insertText"), vec![json!({ "text": "12/03/2024" })]);
    }

    #[tokio::test]
    async fn enter_carries_text_and_arrow_down_is_raw() {
        let (adapter, transport, page) = attached();
        adapter.press_key(page, &KeyStroke::enter()).await.expect("enter");
        adapter.press_key(page, &KeyStroke::arrow_down()).await.expect("arrow");

        let keys = transport.params("Input.dispatchKeyEvent");
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0]["type"], "keyDown");
        assert_eq!(keys[0]["text"], "\r");
        assert_eq!(keys[1]["type"], "keyUp");
        assert_eq!(keys[2]["type"], "rawKeyDown");
        assert!(keys[2].get("text").is_none());
        assert_eq!(keys[2]["windowsVirtualKeyCode"], 40);
    }

    #[tokio::test]
    async fn script_exception_keeps_the_details() {
        let (adapter, transport, page) = attached();
        transport.answer(json!({
            "result": { "type": "object", "subtype": "error" },
            "exceptionDetails": { "text": "Uncaught" }
        }));

        let err = adapter
            .evaluate_script(page, "throw new Error('x')")
            .await
            .expect_err("exception");
        assert_eq!(err.kind, AdapterErrorKind::Internal);
        assert_eq!(err.data, Some(json!({ "text": "Uncaught" })));
    }

    #[tokio::test]
    async fn file_input_receives_paths_through_its_object_id() {
        let (adapter, transport, page) = attached();
        transport.answer(json!({ "result": { "type": "object", "objectId": "obj-7" } }));

        adapter
            .set_file_input_files(
                &ResolvedExecutionContext::for_page(page),
                "input[type=file]",
                &[PathBuf::from("/tmp/ATOrd_0001.pdf")],
                Duration::from_secs(1),
            )
            .await
            .expect("upload");

        let set = transport.params("DOM.setFileInputFiles");
        assert_eq!(set, vec![json!({ "files": ["/tmp/ATOrd_0001.pdf"], "objectId": "obj-7" })]);
        assert_eq!(transport.params("Runtime.releaseObjectGroup").len(), 1);
    }

    #[tokio::test]
    async fn shutdown_detaches_every_tab() {
        let (adapter, _, page) = attached();
        adapter.shutdown().await;
        let err = adapter.evaluate_script(page, "1").await.expect_err("detached");
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
    }
}
