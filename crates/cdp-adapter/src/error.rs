use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Broad failure classes the primitives map onto their own errors.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AdapterErrorKind {
    #[error("navigation timed out")]
    NavTimeout,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("target element not found")]
    TargetNotFound,
    #[error("target element not interactable")]
    NotInteractable,
    #[error("internal error")]
    Internal,
}

#[derive(Clone, Debug)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub hint: Option<String>,
    /// Raw protocol payload, e.g. `exceptionDetails` of a failed evaluation.
    pub data: Option<Value>,
}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind) -> Self {
        Self {
            kind,
            hint: None,
            data: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn io(hint: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::CdpIo).with_hint(hint)
    }

    pub(crate) fn internal(hint: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Internal).with_hint(hint)
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hint {
            Some(hint) => write!(f, "{}: {}", self.kind, hint),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for AdapterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_follows_kind() {
        let err = AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint("no #btnSalvar");
        assert_eq!(err.to_string(), "target element not found: no #btnSalvar");
        assert_eq!(AdapterError::io("closed").kind, AdapterErrorKind::CdpIo);
    }
}
