use serde::Serialize;
use thiserror::Error;

use super::builder::BuildError;
use crate::schema::Violation;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Record too large: {0} bytes (max: {1} bytes)")]
    RecordTooLarge(usize, usize),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Missing '{0}' field")]
    MissingEnvelope(&'static str),

    #[error("Record {index}: decode failed: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Record {index}: validation failed: {}",
        .violations.first().map(ToString::to_string).unwrap_or_default()
    )]
    Validation {
        index: usize,
        violations: Vec<Violation>,
    },

    #[error("Record {index}: {source}")]
    Build {
        index: usize,
        #[source]
        source: BuildError,
    },
}

impl ParseError {
    /// Attach the offending record's position to a build failure.
    pub fn from_build(index: usize, error: BuildError) -> Self {
        match error {
            BuildError::Invalid(violations) => ParseError::Validation { index, violations },
            source => ParseError::Build { index, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::RecordTooLarge(..) => ErrorKind::TooLarge,
            ParseError::InvalidFormat(_)
            | ParseError::InvalidJson(_)
            | ParseError::MissingEnvelope(_)
            | ParseError::Decode { .. } => ErrorKind::Decode,
            ParseError::Validation { .. } => ErrorKind::Validation,
            ParseError::Build { .. } => ErrorKind::Build,
        }
    }
}

/// Classification used for metrics and dead-letter routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No parser is registered for the log type
    UnknownLogType,
    /// Raw record exceeded the configured size limit
    TooLarge,
    /// Raw text did not match the expected structure
    Decode,
    /// A decoded event failed its schema constraints
    Validation,
    /// Result construction failed (configuration problem)
    Build,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownLogType => "unknown_log_type",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::Decode => "decode",
            ErrorKind::Validation => "validation",
            ErrorKind::Build => "build",
        }
    }
}

/// What the ingestion pipeline needs to retry, quarantine or surface a
/// rejected record.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub log_type: String,
    pub kind: ErrorKind,
    pub error: String,
    pub raw_len: usize,
    /// Leading bytes of the raw text, cut on a character boundary
    pub excerpt: String,
}

impl DeadLetter {
    pub fn new(
        log_type: &str,
        kind: ErrorKind,
        error: String,
        raw: &str,
        excerpt_limit: usize,
    ) -> Self {
        Self {
            log_type: log_type.to_string(),
            kind,
            error,
            raw_len: raw.len(),
            excerpt: excerpt(raw, excerpt_limit).to_string(),
        }
    }
}

fn excerpt(raw: &str, limit: usize) -> &str {
    let mut end = limit.min(raw.len());
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_first_violation() {
        let err = ParseError::Validation {
            index: 3,
            violations: vec![
                Violation {
                    field: "recipientAccountId".to_string(),
                    rule: "numeric",
                    message: "must be numeric".to_string(),
                },
                Violation {
                    field: "awsRegion".to_string(),
                    rule: "required",
                    message: "is required".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Record 3: validation failed: recipientAccountId must be numeric"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_from_build_maps_invalid_to_validation() {
        let err = ParseError::from_build(0, BuildError::Invalid(Vec::new()));
        assert!(matches!(err, ParseError::Validation { index: 0, .. }));
        let err = ParseError::from_build(1, BuildError::NotAnObject);
        assert_eq!(err.kind(), ErrorKind::Build);
    }

    #[test]
    fn test_dead_letter_excerpt_respects_char_boundaries() {
        let raw = "ééééé";
        let letter = DeadLetter::new("T", ErrorKind::Decode, "bad".to_string(), raw, 3);
        assert_eq!(letter.excerpt, "é");
        assert_eq!(letter.raw_len, 10);

        let json = serde_json::to_value(&letter).unwrap();
        assert_eq!(json["kind"], "decode");
    }
}
