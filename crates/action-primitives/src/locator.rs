//! Script generation for locating controls.
//!
//! Every descriptor compiles to a JavaScript expression evaluated against a
//! `root` document (the page or an entered frame). Descriptors without a CSS
//! equivalent tag the element they find with [`ANCHOR_ATTRIBUTE`] so that
//! native CDP commands can address it by selector afterwards.

use crate::{
    descriptor::{css_attr_value, ControlDescriptor, TextMatch},
    errors::ActionError,
};
use cdp_adapter::{scope_expression, QueryScope, ResolvedExecutionContext};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Attribute used to tag script-located elements.
pub const ANCHOR_ATTRIBUTE: &str = "data-casefill-anchor";

/// Selector plus the execution context it is valid in.
#[derive(Clone, Debug)]
pub struct ResolvedSelector {
    pub selector: String,
    pub context: Arc<ResolvedExecutionContext>,
}

impl ResolvedSelector {
    pub fn new(selector: String, context: Arc<ResolvedExecutionContext>) -> Self {
        Self { selector, context }
    }
}

/// Selector addressing `control`, plus the tag token when one is needed.
pub fn anchor_selector(control: &ControlDescriptor) -> (String, Option<String>) {
    match control.static_css() {
        Some(css) => (css, None),
        None => {
            let token = format!("cf-{}", Uuid::new_v4().simple());
            (
                format!("[{ANCHOR_ATTRIBUTE}=\"{}\"]", css_attr_value(&token)),
                Some(token),
            )
        }
    }
}

fn js_literal<T: Serialize + ?Sized>(value: &T) -> Result<String, ActionError> {
    serde_json::to_string(value)
        .map_err(|err| ActionError::Internal(format!("failed to encode script literal: {err}")))
}

const PRELUDE: &str = r#"
    const fold = (text) => String(text || '')
        .normalize('NFKD')
        .replace(/[\u0300-\u036f]/g, '')
        .replace(/\s+/g, ' ')
        .trim()
        .toLowerCase();
    const labelOf = (el) => el.getAttribute('data-item-label')
        || el.getAttribute('data-label')
        || el.innerText
        || el.textContent
        || '';
    const isVisible = (el) => {
        const rect = el.getBoundingClientRect();
        const view = el.ownerDocument ? el.ownerDocument.defaultView : null;
        const style = view ? view.getComputedStyle(el) : null;
        return rect.width > 0 && rect.height > 0
            && (!style || (style.visibility !== 'hidden' && style.display !== 'none'));
    };
"#;

const ELEMENT_TEMPLATE: &str = r#"/*casefill:__KIND__*/
(() => {
__PRELUDE__
    const root = __SCOPE__;
    if (!root) { return { status: 'no-frame' }; }
    const el = __FINDER__;
    if (!el) { return { status: 'not-found' }; }
    const token = __TOKEN__;
    if (token) { el.setAttribute('data-casefill-anchor', token); }
__ACTION__
})()
"#;

const PROBE_ACTION: &str = r#"
    const disabled = !!el.disabled
        || el.getAttribute('aria-disabled') === 'true'
        || (el.classList && el.classList.contains('ui-state-disabled'));
    const label = labelOf(el).replace(/\s+/g, ' ').trim();
    return {
        status: 'ok',
        probe: {
            found: true,
            visible: isVisible(el),
            enabled: !disabled,
            id: el.id || null,
            value: 'value' in el && el.value !== undefined ? String(el.value) : null,
            label: label || null,
            aria_controls: el.getAttribute('aria-controls')
        }
    };
"#;

const SCROLL_ACTION: &str = r#"
    el.scrollIntoView({ block: 'center', inline: 'center' });
    return { status: 'ok' };
"#;

const SET_VALUE_ACTION: &str = r#"
    const value = __VALUE__;
    if (typeof el.focus === 'function') { el.focus(); }
    const proto = Object.getPrototypeOf(el);
    const descriptor = proto ? Object.getOwnPropertyDescriptor(proto, 'value') : null;
    if (descriptor && descriptor.set) { descriptor.set.call(el, value); } else { el.value = value; }
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return { status: 'ok', value: String(el.value) };
"#;

/// Visible dialogs that host an iframe, with a selector for that iframe.
pub const DIALOGS_SCRIPT: &str = r#"/*casefill:dialogs*/
(() => {
    const isVisible = (el) => {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
    };
    const quote = (text) => String(text).replace(/(["\\])/g, '\\$1');
    const dialogs = Array.from(document.querySelectorAll('.ui-dialog, [role="dialog"]'));
    const out = [];
    dialogs.forEach((dialog, index) => {
        if (!isVisible(dialog)) { return; }
        const frame = dialog.querySelector('iframe');
        if (!frame) { return; }
        let host;
        if (dialog.id) {
            host = '[id="' + quote(dialog.id) + '"]';
        } else {
            const token = 'cf-dialog-' + index;
            dialog.setAttribute('data-casefill-dialog', token);
            host = '[data-casefill-dialog="' + token + '"]';
        }
        out.push({ id: dialog.id || '', frame_selector: host + ' iframe' });
    });
    return out;
})()
"#;

/// JavaScript expression yielding the element for `control` under `root`, or `null`.
pub fn finder_expression(control: &ControlDescriptor) -> Result<String, ActionError> {
    match control {
        ControlDescriptor::Id(_) | ControlDescriptor::IdSuffix(_) | ControlDescriptor::Css(_) => {
            let css = control.static_css().unwrap_or_default();
            if css.is_empty() {
                return Err(ActionError::AnchorNotFound("empty selector".to_string()));
            }
            Ok(format!(
                "(() => {{ try {{ return root.querySelector({}); }} catch (err) {{ return null; }} }})()",
                js_literal(&css)?
            ))
        }
        ControlDescriptor::FollowingLabel { .. } => {
            let xpath = control.xpath().unwrap_or_default();
            Ok(format!(
                "(() => {{ try {{ const doc = root.ownerDocument || root; return doc.evaluate({}, root, null, 9, null).singleNodeValue; }} catch (err) {{ return null; }} }})()",
                js_literal(&xpath)?
            ))
        }
        ControlDescriptor::Within { scope, css } => Ok(format!(
            "(() => {{ const host = {}; if (!host) {{ return null; }} try {{ return host.querySelector({}); }} catch (err) {{ return null; }} }})()",
            finder_expression(scope)?,
            js_literal(css.trim())?
        )),
        ControlDescriptor::Entry {
            scope,
            item_css,
            text,
            matching,
        } => {
            let compare = match matching {
                TextMatch::Exact => "fold(labelOf(item)) === want",
                TextMatch::Contains => "fold(labelOf(item)).includes(want)",
            };
            Ok(format!(
                "(() => {{ const host = {scope}; if (!host) {{ return null; }} const want = fold({text}); let items; try {{ items = Array.from(host.querySelectorAll({items})); }} catch (err) {{ return null; }} const hits = items.filter((item) => {compare}); return hits.find(isVisible) || hits[0] || null; }})()",
                scope = finder_expression(scope)?,
                text = js_literal(text)?,
                items = js_literal(item_css.trim())?,
                compare = compare,
            ))
        }
    }
}

fn element_script(
    kind: &str,
    scope: &QueryScope,
    control: &ControlDescriptor,
    token: Option<&str>,
    action: &str,
) -> Result<String, ActionError> {
    let scope_js = scope_expression(scope)
        .map_err(|err| ActionError::Internal(format!("scope expression: {err}")))?;
    let token_js = match token {
        Some(token) => js_literal(token)?,
        None => "null".to_string(),
    };
    Ok(ELEMENT_TEMPLATE
        .replace("__KIND__", kind)
        .replace("__PRELUDE__", PRELUDE)
        .replace("__SCOPE__", &scope_js)
        .replace("__FINDER__", &finder_expression(control)?)
        .replace("__TOKEN__", &token_js)
        .replace("__ACTION__", action))
}

pub fn probe_script(
    scope: &QueryScope,
    control: &ControlDescriptor,
    token: Option<&str>,
) -> Result<String, ActionError> {
    element_script("probe", scope, control, token, PROBE_ACTION)
}

pub fn scroll_script(scope: &QueryScope, control: &ControlDescriptor) -> Result<String, ActionError> {
    element_script("scroll", scope, control, None, SCROLL_ACTION)
}

pub fn set_value_script(
    scope: &QueryScope,
    control: &ControlDescriptor,
    value: &str,
) -> Result<String, ActionError> {
    let action = SET_VALUE_ACTION.replace("__VALUE__", &js_literal(value)?);
    element_script("set-value", scope, control, None, &action)
}

/// True when the frame selector reaches a same-origin document.
pub fn frame_check_script(frame_selector: &str) -> Result<String, ActionError> {
    let scope_js = scope_expression(&QueryScope::Frame(frame_selector.to_string()))
        .map_err(|err| ActionError::Internal(format!("scope expression: {err}")))?;
    Ok(format!("/*casefill:frame*/ (() => {{ const doc = {scope_js}; return !!doc; }})()"))
}

/// `status` field of a script result, `"unknown"` when absent.
pub fn script_status(value: &Value) -> &str {
    value
        .get("status")
        .and_then(|status| status.as_str())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_descriptors_skip_tagging() {
        let (selector, token) = anchor_selector(&ControlDescriptor::id("form:nome"));
        assert_eq!(selector, "[id=\"form:nome\"]");
        assert!(token.is_none());
    }

    #[test]
    fn dynamic_descriptors_get_a_token_selector() {
        let control = ControlDescriptor::following_label("Natureza", None);
        let (selector, token) = anchor_selector(&control);
        let token = token.expect("token");
        assert!(token.starts_with("cf-"));
        assert_eq!(selector, format!("[data-casefill-anchor=\"{token}\"]"));
    }

    #[test]
    fn entry_finder_folds_accents_and_prefers_visible() {
        let control = ControlDescriptor::entry(
            ControlDescriptor::id("form:classe_panel"),
            "li",
            "Ação Civil",
            TextMatch::Exact,
        );
        let js = finder_expression(&control).expect("finder");
        assert!(js.contains("\"Ação Civil\""));
        assert!(js.contains("fold(labelOf(item)) === want"));
        assert!(js.contains("hits.find(isVisible)"));
        assert!(js.contains("[id=\\\"form:classe_panel\\\"]"));
    }

    #[test]
    fn probe_script_runs_inside_frame_document() {
        let scope = QueryScope::Frame("[id=\"dlg\"] iframe".into());
        let script = probe_script(&scope, &ControlDescriptor::id("nome"), Some("cf-1")).expect("script");
        assert!(script.starts_with("/*casefill:probe*/"));
        assert!(script.contains("contentDocument"));
        assert!(script.contains("const token = \"cf-1\";"));
        assert!(!script.contains("__"));
    }

    #[test]
    fn set_value_dispatches_input_and_change() {
        let script = set_value_script(&QueryScope::Document, &ControlDescriptor::id("d"), "15/03/2024")
            .expect("script");
        assert!(script.contains("\"15/03/2024\""));
        assert!(script.contains("new Event('input'"));
        assert!(script.contains("new Event('change'"));
    }

    #[test]
    fn status_defaults_to_unknown() {
        assert_eq!(script_status(&serde_json::json!({ "status": "ok" })), "ok");
        assert_eq!(script_status(&Value::Null), "unknown");
    }
}
