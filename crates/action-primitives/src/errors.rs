//! Error types for action primitives

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

/// Failure modes of a single interaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Navigation timed out waiting for the document
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// Bounded wait elapsed before the condition held
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Element is present but hidden, covered or otherwise not clickable
    #[error("Element not clickable: {0}")]
    NotClickable(String),

    /// Element is present but disabled
    #[error("Element not enabled: {0}")]
    NotEnabled(String),

    /// Control descriptor did not resolve to an element
    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    /// Frame selector does not reach an embedded document
    #[error("Frame unavailable: {0}")]
    FrameUnavailable(String),

    /// Session is no longer reachable (browser closed or crashed)
    #[error("Session lost: {0}")]
    SessionLost(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Translate an adapter failure, keeping its hint as the message when present.
    pub fn from_adapter(err: AdapterError, subject: &str) -> Self {
        let detail = err
            .hint
            .clone()
            .unwrap_or_else(|| format!("{} ({subject})", err.kind));
        match err.kind {
            AdapterErrorKind::TargetNotFound => ActionError::AnchorNotFound(detail),
            AdapterErrorKind::NotInteractable => ActionError::NotClickable(detail),
            AdapterErrorKind::NavTimeout => ActionError::NavTimeout(detail),
            AdapterErrorKind::CdpIo | AdapterErrorKind::Internal => {
                ActionError::CdpIo(err.to_string())
            }
        }
    }

    /// Timing failures that a later attempt may not hit
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::WaitTimeout(_)
                | ActionError::NavTimeout(_)
                | ActionError::NotClickable(_)
                | ActionError::CdpIo(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::SessionLost(_) | ActionError::Internal(_) => 3,
            ActionError::NavTimeout(_) | ActionError::CdpIo(_) => 2,
            ActionError::WaitTimeout(_)
            | ActionError::AnchorNotFound(_)
            | ActionError::FrameUnavailable(_)
            | ActionError::NotEnabled(_) => 1,
            ActionError::NotClickable(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_kinds_map_onto_action_errors() {
        let missing = AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint("no #x");
        assert_eq!(
            ActionError::from_adapter(missing, "#x"),
            ActionError::AnchorNotFound("no #x".into())
        );

        let covered = AdapterError::new(AdapterErrorKind::NotInteractable);
        assert!(matches!(
            ActionError::from_adapter(covered, "#x"),
            ActionError::NotClickable(msg) if msg.contains("#x")
        ));
    }

    #[test]
    fn lost_session_is_not_retryable() {
        assert!(!ActionError::SessionLost("closed".into()).is_retryable());
        assert!(ActionError::WaitTimeout("slow".into()).is_retryable());
        assert_eq!(ActionError::SessionLost("closed".into()).severity(), 3);
    }
}
