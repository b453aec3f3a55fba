//! Flow value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a step's failure means for the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStrategy {
    /// Row-level: the row is marked failed and no further steps run.
    Abort,
    /// Field-level: logged, the row continues.
    Continue,
}

/// Final failure of an enveloped operation after every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub description: String,
    pub attempts: u32,
    pub cause: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.description, self.attempts, self.cause
        )
    }
}

/// Result of a step run under [`FailureStrategy::Continue`] or a successful abortable step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T> {
    Completed(T),
    /// Field-level failure, already logged.
    Tolerated(AttemptFailure),
}

impl<T> StepOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            StepOutcome::Completed(value) => Some(value),
            StepOutcome::Tolerated(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&AttemptFailure> {
        match self {
            StepOutcome::Completed(_) => None,
            StepOutcome::Tolerated(failure) => Some(failure),
        }
    }
}
