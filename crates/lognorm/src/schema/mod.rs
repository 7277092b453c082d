//! Code-defined schemas, validation, and the single depth-first walk that
//! validates an event, collects statically tagged indicators, scans embedded
//! raw JSON, and captures the event time.
//!
//! An event type describes itself once through a [`Schema`] table, a list of
//! [`FieldSpec`]s mapping a field name to its accessor, constraints,
//! indicator tag and event-time marker. Nested structures are owned by their
//! parent, so the walk always visits a tree.

pub mod rule;
pub mod table;
pub mod walk;

use thiserror::Error;

pub use rule::{Pattern, Rule, Violation};
pub use table::{Event, FieldRef, FieldSpec, Schema, Schematic};
pub use walk::{inspect, validate, Inspection, Walker};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
