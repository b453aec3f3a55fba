//! Identifiers and routing shared by every casefill layer.

use std::fmt;

use uuid::Uuid;

/// Prefix marking a frame identifier that is really a CSS selector for an embedded frame.
pub const FRAME_SELECTOR_PREFIX: &str = "css=";

/// Frame identifier used for the top-level document.
pub const MAIN_FRAME: &str = "main";

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PageId(pub String);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FrameId(pub String);

impl FrameId {
    pub fn main() -> Self {
        Self(MAIN_FRAME.to_string())
    }

    /// Frame addressed through the CSS selector of its `<iframe>` element.
    pub fn from_selector(selector: &str) -> Self {
        Self(format!("{}{}", FRAME_SELECTOR_PREFIX, selector.trim()))
    }

    pub fn selector(&self) -> Option<&str> {
        let selector = self.0.trim().strip_prefix(FRAME_SELECTOR_PREFIX)?.trim();
        (!selector.is_empty()).then_some(selector)
    }

    pub fn is_main(&self) -> bool {
        self.selector().is_none()
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of the document an action runs against.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecRoute {
    pub session: SessionId,
    pub page: PageId,
    pub frame: FrameId,
    pub mutex_key: String,
}

impl ExecRoute {
    pub fn new(session: SessionId, page: PageId, frame: FrameId) -> Self {
        let mutex_key = format!("frame:{}", frame.0);
        Self {
            session,
            page,
            frame,
            mutex_key,
        }
    }

    pub fn main_frame(session: SessionId, page: PageId) -> Self {
        Self::new(session, page, FrameId::main())
    }

    /// Same session and page, scoped into the embedded frame matched by `selector`.
    pub fn with_frame_selector(&self, selector: &str) -> Self {
        Self::new(
            self.session.clone(),
            self.page.clone(),
            FrameId::from_selector(selector),
        )
    }

    /// Same session and page, back on the top-level document.
    pub fn to_main_frame(&self) -> Self {
        Self::main_frame(self.session.clone(), self.page.clone())
    }
}

impl fmt::Display for ExecRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session={} page={} frame={} mutex={}",
            self.session.0, self.page.0, self.frame.0, self.mutex_key
        )
    }
}
