//! Scripts the adapter evaluates in the page, and the shapes they return.
//!
//! Every script is tagged `/*casefill:<name>*/` so a recorded command log can
//! tell them apart.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;

/// Document a query runs against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryScope {
    Document,
    /// Same-origin frame reached through the CSS selector of its `<iframe>`.
    Frame(String),
}

/// Viewport position and state of a matched element.
///
/// Coordinates are in the top-level viewport even for framed elements, ready
/// for `Input.dispatchMouseEvent`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub visible: bool,
    pub enabled: bool,
    /// False when hit testing at the centre lands on a mask or overlay.
    #[serde(default = "unobstructed_by_default")]
    pub unobstructed: bool,
}

fn unobstructed_by_default() -> bool {
    true
}

impl Anchor {
    pub fn clickable(&self) -> bool {
        self.visible && self.enabled
    }
}

pub(crate) fn js_literal<T: Serialize + ?Sized>(value: &T) -> Result<String, AdapterError> {
    serde_json::to_string(value).map_err(|err| AdapterError::internal(err.to_string()))
}

/// Expression evaluating to the scope's document, or `null` when a frame is
/// missing or cross-origin.
pub fn scope_expression(scope: &QueryScope) -> Result<String, AdapterError> {
    match scope {
        QueryScope::Document => Ok("document".to_string()),
        QueryScope::Frame(selector) => Ok(format!(
            "(() => {{ try {{ const host = document.querySelector({host}); \
             if (!host) {{ return null; }} \
             return host.contentDocument || (host.contentWindow && host.contentWindow.document) || null; \
             }} catch (_) {{ return null; }} }})()",
            host = js_literal(selector)?
        )),
    }
}

const ANCHORS: &str = r#"/*casefill:anchors*/ (() => {
    const doc = __SCOPE__;
    if (!doc) { return []; }
    const host = __HOST__;
    const base = host ? host.getBoundingClientRect() : { left: 0, top: 0 };
    const dx = host ? base.left + (host.clientLeft || 0) : 0;
    const dy = host ? base.top + (host.clientTop || 0) : 0;
    let found;
    try { found = doc.querySelectorAll(__SELECTOR__); } catch (_) { return []; }
    return Array.from(found, (el) => {
        const box = el.getBoundingClientRect();
        const style = doc.defaultView ? doc.defaultView.getComputedStyle(el) : null;
        const cx = box.left + box.width / 2;
        const cy = box.top + box.height / 2;
        const hit = doc.elementFromPoint(cx, cy);
        return {
            x: dx + (Number.isFinite(cx) ? cx : 0),
            y: dy + (Number.isFinite(cy) ? cy : 0),
            visible: box.width > 0 && box.height > 0
                && !(style && (style.visibility === 'hidden' || style.display === 'none')),
            enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
            unobstructed: !hit || hit === el || el.contains(hit) || hit.contains(el)
        };
    });
})()"#;

const ON_ELEMENT: &str = r#"/*casefill:__NAME__*/ (() => {
    const doc = __SCOPE__;
    let el = null;
    try { el = doc ? doc.querySelector(__SELECTOR__) : null; } catch (_) { el = null; }
    if (!el) { return { status: 'not-found' }; }
    __BODY__
    return { status: 'ok' };
})()"#;

/// Per-element bodies for [`element_script`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ElementAction {
    /// Centre the element in the viewport.
    Scroll,
    /// `HTMLElement.click()`, past any overlay.
    Click,
    Focus,
}

impl ElementAction {
    fn name(self) -> &'static str {
        match self {
            ElementAction::Scroll => "scroll",
            ElementAction::Click => "script-click",
            ElementAction::Focus => "focus",
        }
    }

    fn body(self) -> &'static str {
        match self {
            ElementAction::Scroll => "el.scrollIntoView({ block: 'center', inline: 'center' });",
            ElementAction::Click => {
                "el.scrollIntoView({ block: 'center', inline: 'center' }); el.click();"
            }
            ElementAction::Focus => {
                "el.scrollIntoView({ block: 'center', inline: 'center' }); if (el.focus) { el.focus(); }"
            }
        }
    }
}

pub(crate) fn anchors_script(scope: &QueryScope, selector: &str) -> Result<String, AdapterError> {
    let host = match scope {
        QueryScope::Document => "null".to_string(),
        QueryScope::Frame(frame) => format!("document.querySelector({})", js_literal(frame)?),
    };
    Ok(ANCHORS
        .replace("__SCOPE__", &scope_expression(scope)?)
        .replace("__HOST__", &host)
        .replace("__SELECTOR__", &js_literal(selector)?))
}

pub(crate) fn element_script(
    scope: &QueryScope,
    selector: &str,
    action: ElementAction,
) -> Result<String, AdapterError> {
    Ok(ON_ELEMENT
        .replace("__NAME__", action.name())
        .replace("__SCOPE__", &scope_expression(scope)?)
        .replace("__SELECTOR__", &js_literal(selector)?)
        .replace("__BODY__", action.body()))
}

/// Expression returning the element itself, for handing its object id to CDP.
pub(crate) fn element_handle(scope: &QueryScope, selector: &str) -> Result<String, AdapterError> {
    Ok(format!(
        "/*casefill:handle*/ (() => {{ const doc = {scope}; \
         try {{ return doc ? doc.querySelector({selector}) : null; }} catch (_) {{ return null; }} }})()",
        scope = scope_expression(scope)?,
        selector = js_literal(selector)?,
    ))
}

/// `value` of a `Runtime.evaluate` result, `Null` when absent.
pub(crate) fn returned_value(response: &Value) -> Value {
    response
        .pointer("/result/value")
        .cloned()
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_scope_reads_the_content_document() {
        let scope = QueryScope::Frame("[id=\"dlg\"] iframe".into());
        let js = scope_expression(&scope).expect("scope");
        assert!(js.contains("document.querySelector(\"[id=\\\"dlg\\\"] iframe\")"));
        assert!(js.contains("contentDocument"));
        assert_eq!(scope_expression(&QueryScope::Document).expect("scope"), "document");
    }

    #[test]
    fn element_scripts_are_tagged_and_filled() {
        let js = element_script(&QueryScope::Document, "#btnSalvar", ElementAction::Click)
            .expect("script");
        assert!(js.starts_with("/*casefill:script-click*/"));
        assert!(js.contains("el.click()"));
        assert!(js.contains("\"#btnSalvar\""));
        assert!(!js.contains("__"));
    }

    #[test]
    fn anchors_offset_by_the_frame_host() {
        let js = anchors_script(&QueryScope::Frame("#f".into()), "input").expect("script");
        assert!(js.starts_with("/*casefill:anchors*/"));
        assert!(js.contains("const host = document.querySelector(\"#f\");"));
        assert!(js.contains("elementFromPoint"));
    }

    #[test]
    fn missing_anchor_fields_default_to_unobstructed() {
        let anchor: Anchor = serde_json::from_value(serde_json::json!({
            "x": 1.0, "y": 2.0, "visible": true, "enabled": false
        }))
        .expect("anchor");
        assert!(anchor.unobstructed);
        assert!(!anchor.clickable());
    }
}
