//! Time codecs. Every time field names the external encoding it is decoded
//! from and re-encoded to, so a round trip reproduces the input form.
//!
//! Struct fields pick a codec with `#[serde(with = "crate::field::time::rfc3339")]`
//! (or `unix`, `unix_ms`). Configuration-driven callers resolve a codec by
//! name with [`TimeCodec::from_name`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

use super::{FieldError, NullTime, Nullable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeCodec {
    /// RFC 3339 text, e.g. `2020-01-01T00:00:00Z`
    Rfc3339,
    /// Epoch seconds, integer or fractional
    Unix,
    /// Epoch milliseconds
    UnixMs,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeInput {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TimeCodec {
    /// Resolve a codec by its declared name. Unknown names are a
    /// configuration error, not a per-record failure.
    pub fn from_name(name: &str) -> Result<Self, FieldError> {
        match name {
            "rfc3339" => Ok(TimeCodec::Rfc3339),
            "unix" | "unix_seconds" => Ok(TimeCodec::Unix),
            "unix_ms" => Ok(TimeCodec::UnixMs),
            other => Err(FieldError::UnknownCodec(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimeCodec::Rfc3339 => "rfc3339",
            TimeCodec::Unix => "unix",
            TimeCodec::UnixMs => "unix_ms",
        }
    }

    /// Construct a time field from its textual form.
    pub fn parse(&self, text: &str) -> Result<NullTime, FieldError> {
        self.decode_text(text).map(Nullable::Value)
    }

    pub fn decode_text(&self, text: &str) -> Result<DateTime<Utc>, FieldError> {
        let decoded = match self {
            TimeCodec::Rfc3339 => DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            TimeCodec::Unix | TimeCodec::UnixMs => {
                let text = text.trim();
                match text.parse::<i64>() {
                    Ok(n) => self.from_int(n),
                    Err(_) => text.parse::<f64>().ok().and_then(|f| self.from_float(f)),
                }
            }
        };
        decoded.ok_or_else(|| self.malformed(text))
    }

    fn decode(&self, input: TimeInput) -> Result<DateTime<Utc>, FieldError> {
        let decoded = match (self, &input) {
            (TimeCodec::Rfc3339, TimeInput::Int(_) | TimeInput::Float(_)) => None,
            (_, TimeInput::Text(s)) => return self.decode_text(s),
            (_, TimeInput::Int(n)) => self.from_int(*n),
            (_, TimeInput::Float(f)) => self.from_float(*f),
        };
        decoded.ok_or_else(|| match input {
            TimeInput::Int(n) => self.malformed(&n.to_string()),
            TimeInput::Float(f) => self.malformed(&f.to_string()),
            TimeInput::Text(s) => self.malformed(&s),
        })
    }

    fn from_int(&self, n: i64) -> Option<DateTime<Utc>> {
        match self {
            TimeCodec::Unix => DateTime::from_timestamp(n, 0),
            TimeCodec::UnixMs => DateTime::from_timestamp_millis(n),
            TimeCodec::Rfc3339 => None,
        }
    }

    fn from_float(&self, f: f64) -> Option<DateTime<Utc>> {
        if !f.is_finite() {
            return None;
        }
        let seconds = match self {
            TimeCodec::Unix => f,
            TimeCodec::UnixMs => f / 1000.0,
            TimeCodec::Rfc3339 => return None,
        };
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }

    fn malformed(&self, input: &str) -> FieldError {
        FieldError::MalformedTime {
            codec: self.name(),
            input: input.to_string(),
        }
    }

    /// Canonical external form, as text.
    pub fn format(&self, time: &DateTime<Utc>) -> String {
        match self {
            TimeCodec::Rfc3339 => time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            TimeCodec::Unix if time.timestamp_subsec_nanos() == 0 => time.timestamp().to_string(),
            TimeCodec::Unix => format!("{}.{:09}", time.timestamp(), time.timestamp_subsec_nanos()),
            TimeCodec::UnixMs => time.timestamp_millis().to_string(),
        }
    }

    pub fn serialize<S>(&self, value: &NullTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let time = match value {
            Nullable::Value(t) => t,
            Nullable::Absent | Nullable::Null => return serializer.serialize_none(),
        };
        match self {
            TimeCodec::Rfc3339 => serializer.serialize_str(&self.format(time)),
            TimeCodec::Unix if time.timestamp_subsec_nanos() == 0 => {
                serializer.serialize_i64(time.timestamp())
            }
            TimeCodec::Unix => serializer.serialize_f64(
                time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9,
            ),
            TimeCodec::UnixMs => serializer.serialize_i64(time.timestamp_millis()),
        }
    }

    pub fn deserialize<'de, D>(&self, deserializer: D) -> Result<NullTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<TimeInput>::deserialize(deserializer)? {
            None => Ok(Nullable::Null),
            Some(input) => self.decode(input).map(Nullable::Value).map_err(D::Error::custom),
        }
    }
}

pub mod rfc3339 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NullTime, serializer: S) -> Result<S::Ok, S::Error> {
        TimeCodec::Rfc3339.serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NullTime, D::Error> {
        TimeCodec::Rfc3339.deserialize(deserializer)
    }
}

pub mod unix {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NullTime, serializer: S) -> Result<S::Ok, S::Error> {
        TimeCodec::Unix.serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NullTime, D::Error> {
        TimeCodec::Unix.deserialize(deserializer)
    }
}

pub mod unix_ms {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NullTime, serializer: S) -> Result<S::Ok, S::Error> {
        TimeCodec::UnixMs.serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NullTime, D::Error> {
        TimeCodec::UnixMs.deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamped {
        #[serde(default, skip_serializing_if = "Nullable::is_absent", with = "rfc3339")]
        at: NullTime,
        #[serde(default, skip_serializing_if = "Nullable::is_absent", with = "unix")]
        epoch: NullTime,
        #[serde(default, skip_serializing_if = "Nullable::is_absent", with = "unix_ms")]
        epoch_ms: NullTime,
    }

    #[test]
    fn test_from_name() {
        assert_eq!(TimeCodec::from_name("rfc3339").unwrap(), TimeCodec::Rfc3339);
        assert_eq!(TimeCodec::from_name("unix").unwrap(), TimeCodec::Unix);
        assert!(matches!(
            TimeCodec::from_name("strftime"),
            Err(FieldError::UnknownCodec(_))
        ));
    }

    #[test]
    fn test_parse_rfc3339() {
        let t = TimeCodec::Rfc3339.parse("2020-01-01T01:00:00+01:00").unwrap();
        assert_eq!(t.value().unwrap().timestamp(), 1_577_836_800);
        assert!(TimeCodec::Rfc3339.parse("yesterday").is_err());
    }

    #[test]
    fn test_parse_unix_text() {
        let t = TimeCodec::Unix.parse("1577836800.5").unwrap();
        let t = t.value().unwrap();
        assert_eq!(t.timestamp(), 1_577_836_800);
        assert_eq!(t.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_rfc3339_round_trip() {
        let input = r#"{"at":"2020-01-01T00:00:00Z"}"#;
        let s: Stamped = serde_json::from_str(input).unwrap();
        assert!(s.epoch.is_absent());
        assert_eq!(serde_json::to_string(&s).unwrap(), input);
    }

    #[test]
    fn test_numeric_codecs_round_trip() {
        let input = r#"{"epoch":1577836800,"epoch_ms":1577836800123}"#;
        let s: Stamped = serde_json::from_str(input).unwrap();
        assert_eq!(s.epoch_ms.value().unwrap().timestamp_subsec_millis(), 123);
        assert_eq!(serde_json::to_string(&s).unwrap(), input);
    }

    #[test]
    fn test_unix_accepts_numeric_string() {
        let s: Stamped = serde_json::from_str(r#"{"epoch":"1577836800"}"#).unwrap();
        assert_eq!(s.epoch.value().unwrap().timestamp(), 1_577_836_800);
    }

    #[test]
    fn test_null_time_stays_null() {
        let s: Stamped = serde_json::from_str(r#"{"at":null}"#).unwrap();
        assert!(s.at.is_null());
        assert_eq!(serde_json::to_string(&s).unwrap(), r#"{"at":null}"#);
    }

    #[test]
    fn test_malformed_time_is_an_error() {
        assert!(serde_json::from_str::<Stamped>(r#"{"at":"not a time"}"#).is_err());
        assert!(serde_json::from_str::<Stamped>(r#"{"at":1577836800}"#).is_err());
    }
}
