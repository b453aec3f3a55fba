//! Chrome DevTools Protocol adapter.
//!
//! Launches Chrome or attaches to a running one, holds the one tab a run
//! works in, and sends it the DOM, input and upload commands the primitives
//! are built from.

pub mod adapter;
pub mod dom;
pub mod error;
pub mod keys;
pub mod launch;
pub mod transport;

pub use adapter::{Cdp, CdpAdapter, PageId, ResolvedExecutionContext};
pub use dom::{scope_expression, Anchor, QueryScope};
pub use error::{AdapterError, AdapterErrorKind};
pub use keys::KeyStroke;
pub use launch::{locate_chrome, CdpConfig, CHROME_ENV};
pub use transport::{CdpTransport, ChromiumTransport, CommandTarget};
