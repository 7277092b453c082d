use std::collections::HashMap;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::metrics::NormalizerMetrics;
use super::{formats, DeadLetter, ErrorKind, LogParser, NormalizedRecord, ParseError, ResultBuilder};
use super::MAX_RECORD_SIZE;
use crate::conf::NormalizerConfig;

/// Startup-time failures while assembling the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Parser already registered for log type '{0}'")]
    Duplicate(String),

    #[error("Parser registered as '{registered}' reports log type '{reported}'")]
    LogTypeMismatch { registered: String, reported: String },

    #[error("No built-in parser for log type '{0}'")]
    UnknownLogType(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No parser registered for log type '{0}'")]
    UnknownLogType(String),

    #[error("{log_type}: {source}")]
    Parse {
        log_type: String,
        #[source]
        source: ParseError,
    },
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::UnknownLogType(_) => ErrorKind::UnknownLogType,
            DispatchError::Parse { source, .. } => source.kind(),
        }
    }

    pub fn log_type(&self) -> &str {
        match self {
            DispatchError::UnknownLogType(log_type) => log_type,
            DispatchError::Parse { log_type, .. } => log_type,
        }
    }

    /// Package the rejected input for the ingestion pipeline's dead-letter path.
    pub fn dead_letter(&self, raw: &str, excerpt_limit: usize) -> DeadLetter {
        DeadLetter::new(self.log_type(), self.kind(), self.to_string(), raw, excerpt_limit)
    }
}

pub struct RegistryBuilder {
    parsers: HashMap<String, Box<dyn LogParser>>,
    max_record_size: usize,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
            max_record_size: MAX_RECORD_SIZE,
        }
    }

    pub fn max_record_size(&mut self, bytes: usize) -> &mut Self {
        self.max_record_size = bytes;
        self
    }

    /// Register the parser produced by `factory` under `log_type`.
    ///
    /// The factory is only invoked when the name is free.
    pub fn register<F>(&mut self, log_type: &str, factory: F) -> Result<&mut Self, RegistryError>
    where
        F: FnOnce() -> Box<dyn LogParser>,
    {
        if self.parsers.contains_key(log_type) {
            return Err(RegistryError::Duplicate(log_type.to_string()));
        }

        let parser = factory();
        if parser.log_type() != log_type {
            return Err(RegistryError::LogTypeMismatch {
                registered: log_type.to_string(),
                reported: parser.log_type().to_string(),
            });
        }

        info!(log_type, "Registered parser");
        self.parsers.insert(log_type.to_string(), parser);
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            parsers: self.parsers,
            max_record_size: self.max_record_size,
            metrics: NormalizerMetrics::new(),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Log type → parser mapping. Immutable once built; lookups need no locking.
pub struct Registry {
    parsers: HashMap<String, Box<dyn LogParser>>,
    max_record_size: usize,
    metrics: NormalizerMetrics,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry holding the built-in parsers enabled by `config`.
    pub fn from_config(config: &NormalizerConfig) -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::new();
        builder.max_record_size(config.max_record_size);

        for log_type in &config.enabled_log_types {
            if formats::lookup(log_type).is_none() {
                return Err(RegistryError::UnknownLogType(log_type.clone()));
            }
        }

        for &(log_type, factory) in formats::BUILTIN {
            if !config.enabled_log_types.is_empty()
                && !config.enabled_log_types.iter().any(|t| t == log_type)
            {
                continue;
            }
            let results = ResultBuilder::new().with_event_time_fallback(config.event_time_fallback);
            builder.register(log_type, || factory(results))?;
        }

        Ok(builder.build())
    }

    pub fn get(&self, log_type: &str) -> Option<&dyn LogParser> {
        self.parsers.get(log_type).map(|p| p.as_ref())
    }

    /// Registered log types, sorted.
    pub fn log_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn max_record_size(&self) -> usize {
        self.max_record_size
    }

    pub fn metrics(&self) -> &NormalizerMetrics {
        &self.metrics
    }

    /// Look up the parser for `log_type` and delegate `raw` to it.
    pub fn dispatch(
        &self,
        log_type: &str,
        raw: &str,
    ) -> Result<Vec<NormalizedRecord>, DispatchError> {
        let Some(parser) = self.get(log_type) else {
            self.metrics.record_failure(None, ErrorKind::UnknownLogType);
            warn!(log_type, "Rejected batch: unknown log type");
            return Err(DispatchError::UnknownLogType(log_type.to_string()));
        };

        let started = Instant::now();
        let outcome = if raw.len() > self.max_record_size {
            Err(ParseError::RecordTooLarge(raw.len(), self.max_record_size))
        } else {
            parser.parse(raw)
        };

        match outcome {
            Ok(records) => {
                let elapsed = started.elapsed().as_nanos() as u64;
                self.metrics.record_success(log_type, records.len(), elapsed);
                debug!(log_type, results = records.len(), "Normalized batch");
                Ok(records)
            }
            Err(source) => {
                let kind = source.kind();
                self.metrics.record_failure(Some(log_type), kind);
                warn!(log_type, kind = kind.as_str(), error = %source, "Rejected batch");
                Err(DispatchError::Parse {
                    log_type: log_type.to_string(),
                    source,
                })
            }
        }
    }
}
