//! Flow execution error types

use thiserror::Error;

use crate::types::AttemptFailure;

/// Row-level failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    /// A step whose failure aborts the row
    #[error("{step_id} failed: {reason}")]
    StepFailed { step_id: String, reason: String },

    /// The browser session stopped answering
    #[error("session lost: {0}")]
    SessionLost(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AttemptFailure> for FlowError {
    fn from(failure: AttemptFailure) -> Self {
        FlowError::StepFailed {
            step_id: failure.description,
            reason: failure.cause,
        }
    }
}

impl From<action_primitives::ActionError> for FlowError {
    fn from(err: action_primitives::ActionError) -> Self {
        match err {
            action_primitives::ActionError::SessionLost(msg) => FlowError::SessionLost(msg),
            other => FlowError::Internal(other.to_string()),
        }
    }
}
