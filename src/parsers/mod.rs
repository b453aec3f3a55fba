//! Cell values and the normalizers applied to them before entry.

pub mod cell;
pub mod dates;
pub mod values;

pub use cell::CellValue;
pub use dates::{normalize as normalize_date, CANONICAL_DATE_FORMAT};
pub use values::{normalize_label, safe_text, to_amount, xpath_literal};
