//! Model: NormalizerConfig and its validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::formats;
use crate::parser::{DEAD_LETTER_EXCERPT, MAX_RECORD_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Raw records above this many bytes are rejected before decoding
    pub max_record_size: usize,
    /// Use ingestion time when the event-time field is absent or null
    pub event_time_fallback: bool,
    /// Built-in parsers to register; empty registers all of them
    pub enabled_log_types: Vec<String>,
    pub default_log_type: String,
    /// Bytes of raw text kept in a dead letter
    pub dead_letter_excerpt: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_record_size: MAX_RECORD_SIZE,
            event_time_fallback: true,
            enabled_log_types: Vec::new(),
            default_log_type: formats::cloudtrail::LOG_TYPE.to_string(),
            dead_letter_excerpt: DEAD_LETTER_EXCERPT,
        }
    }
}

impl NormalizerConfig {
    /// Validate configuration values against the parsers this build ships
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_record_size == 0 {
            return Err(ConfigError::Invalid("max_record_size must be > 0".to_string()));
        }
        if let Some(unknown) = self
            .enabled_log_types
            .iter()
            .find(|t| formats::lookup(t).is_none())
        {
            return Err(ConfigError::Invalid(format!(
                "enabled_log_types contains unknown log type '{}' (available: {})",
                unknown,
                formats::builtin_log_types().collect::<Vec<_>>().join(", ")
            )));
        }
        if formats::lookup(&self.default_log_type).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default_log_type '{}' has no parser",
                self.default_log_type
            )));
        }
        if !self.enabled_log_types.is_empty()
            && !self.enabled_log_types.contains(&self.default_log_type)
        {
            return Err(ConfigError::Invalid(format!(
                "default_log_type '{}' is not enabled",
                self.default_log_type
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = NormalizerConfig::default();
        assert_eq!(cfg.max_record_size, 1_048_576);
        assert!(cfg.event_time_fallback);
        assert!(cfg.enabled_log_types.is_empty());
        assert_eq!(cfg.default_log_type, "AWS.CloudTrail");
        assert_eq!(cfg.dead_letter_excerpt, 256);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: NormalizerConfig = toml::from_str("event_time_fallback = false").unwrap();
        assert!(!cfg.event_time_fallback);
        assert_eq!(cfg.max_record_size, MAX_RECORD_SIZE);
    }

    #[test]
    fn test_zero_record_size_rejected() {
        let cfg = NormalizerConfig {
            max_record_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_log_type_rejected() {
        let cfg = NormalizerConfig {
            enabled_log_types: vec!["AWS.CloudTrail".to_string(), "Okta.SystemLog".to_string()],
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Okta.SystemLog"));
    }

    #[test]
    fn test_default_log_type_must_be_enabled() {
        let cfg = NormalizerConfig {
            default_log_type: "Nope".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
