//! Interaction primitives for driving a web form through the CDP adapter.
//!
//! - bounded waits in three tiers (short, medium, long)
//! - clicks with a native path and a forced script fallback
//! - bulk and paced typing, key presses, scripted value assignment
//! - frame entry/exit for dialogs hosted in embedded documents
//! - file uploads and a liveness probe

pub mod descriptor;
pub mod errors;
mod locator;
mod primitives;
pub mod types;
mod waiting;

pub use descriptor::*;
pub use errors::*;
pub use locator::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
