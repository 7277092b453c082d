//! Indicator extraction
//!
//! Indicators are `(kind, value)` pairs surfaced as independently searchable
//! fields on every result. They come from two places:
//!
//! - **static**: schema fields tagged with a kind contribute their value
//!   directly during the schema walk (see [`crate::schema`])
//! - **dynamic**: every embedded raw-JSON field is decoded and each string leaf
//!   is offered to every registered [`Recognizer`]
//!
//! Extraction never fails a parse. A blob that cannot be decoded contributes
//! nothing and is reported as a warning by the caller.

pub mod kind;
pub mod recognize;
pub mod scan;
pub mod set;

pub use kind::IndicatorKind;
pub use recognize::{Recognizer, Recognizers};
pub use scan::{scan_raw, scan_value};
pub use set::IndicatorSet;
