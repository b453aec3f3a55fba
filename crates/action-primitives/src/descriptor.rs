//! Declarative descriptions of page controls.
//!
//! A descriptor is resolved freshly on every use, so stale handles never leak
//! across waits. Static forms render straight to CSS; the rest are located by
//! script and tagged with a one-off attribute.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an entry's visible label is compared with the wanted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextMatch {
    /// Accent- and case-insensitive equality after whitespace collapsing.
    Exact,
    /// Accent- and case-insensitive substring.
    Contains,
}

/// Stable description of a control on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlDescriptor {
    /// Full element id.
    Id(String),
    /// Element whose id ends with the fragment.
    IdSuffix(String),
    /// Raw CSS selector.
    Css(String),
    /// First input after a label containing the text, optionally narrowed by id fragment.
    FollowingLabel {
        label: String,
        input_fragment: Option<String>,
    },
    /// Item under a scope whose visible label matches `text`.
    Entry {
        scope: Box<ControlDescriptor>,
        item_css: String,
        text: String,
        matching: TextMatch,
    },
    /// First element matching `css` inside the scope element.
    Within {
        scope: Box<ControlDescriptor>,
        css: String,
    },
}

impl ControlDescriptor {
    pub fn id(id: impl Into<String>) -> Self {
        ControlDescriptor::Id(id.into())
    }

    pub fn id_suffix(fragment: impl Into<String>) -> Self {
        ControlDescriptor::IdSuffix(fragment.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        ControlDescriptor::Css(selector.into())
    }

    pub fn following_label(label: impl Into<String>, input_fragment: Option<&str>) -> Self {
        ControlDescriptor::FollowingLabel {
            label: label.into(),
            input_fragment: input_fragment.map(str::to_string),
        }
    }

    pub fn entry(
        scope: ControlDescriptor,
        item_css: impl Into<String>,
        text: impl Into<String>,
        matching: TextMatch,
    ) -> Self {
        ControlDescriptor::Entry {
            scope: Box::new(scope),
            item_css: item_css.into(),
            text: text.into(),
            matching,
        }
    }

    pub fn within(scope: ControlDescriptor, css: impl Into<String>) -> Self {
        ControlDescriptor::Within {
            scope: Box::new(scope),
            css: css.into(),
        }
    }

    /// CSS selector equivalent, when the descriptor needs no script to locate.
    pub fn static_css(&self) -> Option<String> {
        match self {
            ControlDescriptor::Id(id) => Some(format!("[id=\"{}\"]", css_attr_value(id))),
            ControlDescriptor::IdSuffix(fragment) => {
                Some(format!("[id$=\"{}\"]", css_attr_value(fragment)))
            }
            ControlDescriptor::Css(selector) => Some(selector.trim().to_string()),
            ControlDescriptor::Within { scope, css } => {
                scope.static_css().map(|outer| format!("{outer} {}", css.trim()))
            }
            ControlDescriptor::FollowingLabel { .. } | ControlDescriptor::Entry { .. } => None,
        }
    }

    /// XPath for label-relative descriptors.
    pub fn xpath(&self) -> Option<String> {
        match self {
            ControlDescriptor::FollowingLabel {
                label,
                input_fragment,
            } => {
                let base = format!(
                    "//label[contains(normalize-space(.), {})]/following::input",
                    xpath_literal(label)
                );
                Some(match input_fragment {
                    Some(fragment) => {
                        format!("{base}[contains(@id, {})][1]", xpath_literal(fragment))
                    }
                    None => format!("{base}[1]"),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for ControlDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlDescriptor::Id(id) => write!(f, "#{id}"),
            ControlDescriptor::IdSuffix(fragment) => write!(f, "[id$={fragment}]"),
            ControlDescriptor::Css(selector) => write!(f, "css({selector})"),
            ControlDescriptor::FollowingLabel {
                label,
                input_fragment,
            } => match input_fragment {
                Some(fragment) => write!(f, "label({label})+input[{fragment}]"),
                None => write!(f, "label({label})+input"),
            },
            ControlDescriptor::Entry {
                scope,
                item_css,
                text,
                matching,
            } => write!(f, "{scope} > {item_css} {matching:?}({text})"),
            ControlDescriptor::Within { scope, css } => write!(f, "{scope} {css}"),
        }
    }
}

/// Escapes a value for use inside a double-quoted CSS attribute selector.
pub fn css_attr_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quotes text as an XPath 1.0 string literal, falling back to `concat()` when
/// the text holds both quote kinds.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_render_as_attribute_selectors() {
        assert_eq!(
            ControlDescriptor::id("form:classe_input").static_css().as_deref(),
            Some("[id=\"form:classe_input\"]")
        );
        assert_eq!(
            ControlDescriptor::id_suffix(":btnSalvar").static_css().as_deref(),
            Some("[id$=\":btnSalvar\"]")
        );
    }

    #[test]
    fn within_composes_when_scope_is_static() {
        let panel = ControlDescriptor::id("form:orgao_panel");
        let filter = ControlDescriptor::within(panel, "input[id$='_filter']");
        assert_eq!(
            filter.static_css().as_deref(),
            Some("[id=\"form:orgao_panel\"] input[id$='_filter']")
        );

        let entry = ControlDescriptor::entry(
            ControlDescriptor::id("p"),
            "li",
            "Civil",
            TextMatch::Exact,
        );
        assert!(ControlDescriptor::within(entry, "span").static_css().is_none());
    }

    #[test]
    fn following_label_builds_xpath() {
        let descriptor = ControlDescriptor::following_label("Data do Fato", Some("dtFato"));
        assert_eq!(
            descriptor.xpath().as_deref(),
            Some("//label[contains(normalize-space(.), 'Data do Fato')]/following::input[contains(@id, 'dtFato')][1]")
        );
        assert!(descriptor.static_css().is_none());
    }

    #[test]
    fn xpath_literal_handles_quotes() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("d'Ávila"), "\"d'Ávila\"");
        assert_eq!(
            xpath_literal("a'b\"c"),
            "concat('a', \"'\", 'b\"c')"
        );
    }

    #[test]
    fn css_values_escape_quotes() {
        assert_eq!(css_attr_value("a\"b"), "a\\\"b");
    }
}
