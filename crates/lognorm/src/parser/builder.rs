//! Result construction: attaches log type, row id, event time, parse time
//! and the merged indicator set to a validated event.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::value::{to_raw_value, RawValue};
use thiserror::Error;

use crate::field::TimeCodec;
use crate::indicator::{IndicatorSet, Recognizers};
use crate::schema::{inspect, Event, Inspection, Violation};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Event failed validation with {} violation(s)", .0.len())]
    Invalid(Vec<Violation>),

    #[error(
        "No event time for {log_type} (time field: {field}) \
         and ingestion-time fallback is disabled"
    )]
    MissingEventTime { log_type: String, field: &'static str },

    #[error("Event did not serialize to a JSON object")]
    NotAnObject,

    #[error("Event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The terminal output record. Immutable once built.
///
/// Serializes flat: the event's own fields, then `p_log_type`, `p_row_id`,
/// `p_event_time`, `p_parse_time` and one `p_any_*` array per indicator kind.
///
/// Event fields are held as raw JSON text keyed by name, so embedded
/// sub-documents are carried through exactly as decoded and never re-parsed.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    log_type: String,
    row_id: String,
    event_time: DateTime<Utc>,
    parse_time: DateTime<Utc>,
    event: BTreeMap<String, Box<RawValue>>,
    indicators: IndicatorSet,
}

impl NormalizedRecord {
    pub fn log_type(&self) -> &str {
        &self.log_type
    }

    pub fn row_id(&self) -> &str {
        &self.row_id
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    pub fn parse_time(&self) -> DateTime<Utc> {
        self.parse_time
    }

    /// Top-level event fields in key order.
    pub fn event_fields(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.event.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn event_field(&self, name: &str) -> Option<&RawValue> {
        self.event.get(name).map(Box::as_ref)
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.event {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("p_log_type", &self.log_type)?;
        map.serialize_entry("p_row_id", &self.row_id)?;
        map.serialize_entry("p_event_time", &TimeCodec::Rfc3339.format(&self.event_time))?;
        map.serialize_entry("p_parse_time", &TimeCodec::Rfc3339.format(&self.parse_time))?;
        self.indicators.serialize_entries(&mut map)?;
        map.end()
    }
}

/// Row ids unique for the lifetime of a generator.
///
/// The prefix combines the process id, the creation instant and a
/// per-process instance counter, so re-processing the same input yields
/// different ids. The suffix is an atomic counter, safe to share across
/// threads.
#[derive(Debug)]
pub struct RowIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl RowIdGenerator {
    pub fn new() -> Self {
        static INSTANCES: AtomicU64 = AtomicU64::new(0);

        let started = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
        let instance = INSTANCES.fetch_add(1, Ordering::Relaxed);
        Self {
            prefix: format!(
                "{:08x}{:012x}{:04x}",
                std::process::id(),
                started & 0xffff_ffff_ffff,
                instance & 0xffff
            ),
            next: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{:08x}", self.prefix, n)
    }
}

impl Default for RowIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ResultBuilder {
    row_ids: RowIdGenerator,
    recognizers: Arc<Recognizers>,
    clock: fn() -> DateTime<Utc>,
    event_time_fallback: bool,
}

impl ResultBuilder {
    /// Built-in recognizers, wall clock, ingestion-time fallback enabled.
    pub fn new() -> Self {
        Self {
            row_ids: RowIdGenerator::new(),
            recognizers: Arc::new(Recognizers::builtin()),
            clock: Utc::now,
            event_time_fallback: true,
        }
    }

    pub fn with_recognizers(mut self, recognizers: Arc<Recognizers>) -> Self {
        self.recognizers = recognizers;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_time_fallback(mut self, enabled: bool) -> Self {
        self.event_time_fallback = enabled;
        self
    }

    pub fn recognizers(&self) -> &Recognizers {
        &self.recognizers
    }

    /// Validate the event, extract its indicators and wrap it.
    pub fn build<E>(&self, log_type: &str, event: &E) -> Result<NormalizedRecord, BuildError>
    where
        E: Event + Serialize,
    {
        let inspection = inspect(event, &self.recognizers);
        if !inspection.is_valid() {
            return Err(BuildError::Invalid(inspection.violations));
        }
        self.build_inspected(log_type, event, inspection)
    }

    /// Wrap an event whose walk has already been done.
    pub fn build_inspected<E>(
        &self,
        log_type: &str,
        event: &E,
        inspection: Inspection,
    ) -> Result<NormalizedRecord, BuildError>
    where
        E: Event + Serialize,
    {
        let parse_time = (self.clock)();
        let event_time = match inspection.event_time.into_value() {
            Some(t) => t,
            None if self.event_time_fallback => parse_time,
            None => {
                return Err(BuildError::MissingEventTime {
                    log_type: log_type.to_string(),
                    field: event.event_time_field().unwrap_or("<none>"),
                })
            }
        };

        // Raw sub-documents are written verbatim; nothing here parses them.
        let payload = to_raw_value(event)?;
        if !payload.get().starts_with('{') {
            return Err(BuildError::NotAnObject);
        }
        let event: BTreeMap<String, Box<RawValue>> = serde_json::from_str(payload.get())?;

        Ok(NormalizedRecord {
            log_type: log_type.to_string(),
            row_id: self.row_ids.next_id(),
            event_time,
            parse_time,
            event,
            indicators: inspection.indicators,
        })
    }
}

impl Default for ResultBuilder {
    fn default() -> Self {
        Self::new()
    }
}
