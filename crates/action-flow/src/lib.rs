//! Flow control for the row workflow
//!
//! A single retry policy ([`RetryEnvelope`]: two attempts, fixed cool-down) and
//! a step runner that applies it and sorts failures into field-level
//! (tolerated) and row-level (abort) according to a [`FailureStrategy`].

pub mod envelope;
pub mod errors;
pub mod executor;
pub mod types;

pub use envelope::RetryEnvelope;
pub use errors::FlowError;
pub use executor::StepExecutor;
pub use types::{AttemptFailure, FailureStrategy, StepOutcome};
