//! Core data types for action primitives

use casefill_core_types::{ActionId, ExecRoute};
use cdp_adapter::KeyStroke;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::ControlDescriptor;

/// Execution context for a single interaction.
///
/// The route names the main document of the session's page; frame entry is
/// tracked by the primitives themselves.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    /// Target execution route (session/page)
    pub route: ExecRoute,

    /// Unique identifier for this action
    pub action_id: ActionId,
}

impl ExecCtx {
    pub fn new(route: ExecRoute) -> Self {
        Self {
            route,
            action_id: ActionId::new(),
        }
    }

    /// Same route, fresh action id.
    pub fn next(&self) -> Self {
        Self::new(self.route.clone())
    }
}

/// Bounded wait tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitTier {
    Short,
    Medium,
    Long,
}

impl Default for WaitTier {
    fn default() -> Self {
        WaitTier::Short
    }
}

/// Condition polled by `wait_for`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Control present and rendered.
    Visible(ControlDescriptor),
    /// Control absent or not rendered.
    Hidden(ControlDescriptor),
    /// Page URL contains the fragment.
    UrlContains(String),
    /// Fixed pause.
    Duration(u64),
}

/// How a click is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickPolicy {
    /// Native mouse events first; forced script click when the native path is blocked.
    NativeThenScript,
    /// Script-level activation only.
    ScriptOnly,
}

/// Keys the workflow sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    ArrowDown,
    Tab,
    Escape,
}

impl Key {
    pub fn stroke(self) -> KeyStroke {
        match self {
            Key::Enter => KeyStroke::enter(),
            Key::ArrowDown => KeyStroke::arrow_down(),
            Key::Tab => KeyStroke::tab(),
            Key::Escape => KeyStroke::escape(),
        }
    }
}

/// Text entry mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeMode {
    /// Select-all, delete, insert the whole value at once.
    Bulk { confirm: Option<Key> },
    /// Clear, then one keystroke per character with a delay, then the confirm key if any.
    Paced {
        char_delay_ms: u64,
        confirm: Option<Key>,
    },
}

impl TypeMode {
    pub fn bulk() -> Self {
        TypeMode::Bulk { confirm: None }
    }

    pub fn bulk_then(key: Key) -> Self {
        TypeMode::Bulk { confirm: Some(key) }
    }

    pub fn paced(char_delay_ms: u64, confirm: Option<Key>) -> Self {
        TypeMode::Paced {
            char_delay_ms,
            confirm,
        }
    }
}

/// Point-in-time view of a control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementProbe {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub aria_controls: Option<String>,
}

impl ElementProbe {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.found && self.visible
    }

    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// A visible dialog that hosts an embedded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogProbe {
    #[serde(default)]
    pub id: String,
    /// Selector of the dialog's iframe, usable with `enter_frame`.
    pub frame_selector: String,
}

/// Outcome of a primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub ok: bool,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,

    pub latency_ms: u64,

    /// Set when the primary path failed and a fallback delivered the action.
    pub fallback: Option<String>,
}

impl ActionReport {
    pub fn success(started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            ok: true,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}
