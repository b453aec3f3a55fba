//! Control resolvers: the protocols for driving composite widgets of the
//! case form on top of the interaction primitives.
//!
//! - overlay single-select (label opens a floating panel, optional filter)
//! - autocomplete, free (first suggestion) and exact-label (hidden companion)
//! - dialog sessions hosted in an embedded frame

pub mod api;
pub mod autocomplete;
pub mod dialog;
pub mod errors;
pub mod overlay;
pub mod tempo;
pub mod text;

#[cfg(any(test, feature = "fake-page"))]
pub mod fake;

pub use api::{ResolverBuilder, Resolvers};
pub use autocomplete::CompanionIds;
pub use dialog::{DialogButton, DialogField, DialogOutcome, DialogSpec};
pub use errors::ResolveError;
pub use overlay::{region_value, OverlayField};
pub use tempo::Tempo;
pub use text::normalize_label;
