//! Typed field model: nullable wrappers used for every parsed attribute.
//!
//! Every field distinguishes three states:
//!
//! - **absent**: the key never appeared in the input (the default)
//! - **null**: the key appeared with an explicit JSON `null`
//! - **present**: the key carried a value (an empty string is still present)
//!
//! Containing structs must annotate each field with
//! `#[serde(default, skip_serializing_if = "Nullable::is_absent")]` so that
//! absent fields are omitted on output and missing keys decode as absent.

pub mod nullable;
pub mod raw;
pub mod time;

use thiserror::Error;

pub use nullable::Nullable;
pub use raw::RawJson;
pub use time::TimeCodec;

pub type NullString = Nullable<String>;
pub type NullBool = Nullable<bool>;
pub type NullTime = Nullable<chrono::DateTime<chrono::Utc>>;
pub type NullRaw = Nullable<RawJson>;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Unknown time codec: {0}")]
    UnknownCodec(String),

    #[error("Malformed {codec} time: {input:?}")]
    MalformedTime { codec: &'static str, input: String },

    #[error("Malformed boolean: {0:?}")]
    MalformedBool(String),

    #[error("Malformed raw JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}
