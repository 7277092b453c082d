use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{FieldError, NullBool};

/// A discriminated nullable value: absent, null, or present.
///
/// Reading the payload never panics; use [`Nullable::value`] and check the
/// returned `Option`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Nullable<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for Nullable<T> {
    fn default() -> Self {
        Nullable::Absent
    }
}

impl<T> Nullable<T> {
    /// `None` maps to null, not absent: the caller saw the key.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Nullable::Value(v),
            None => Nullable::Null,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Nullable::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Nullable::Null)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Nullable::Value(_))
    }

    /// Absent or null.
    pub fn is_missing(&self) -> bool {
        !self.is_present()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Nullable::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Nullable::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Nullable<&T> {
        match self {
            Nullable::Absent => Nullable::Absent,
            Nullable::Null => Nullable::Null,
            Nullable::Value(v) => Nullable::Value(v),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Nullable<U> {
        match self {
            Nullable::Absent => Nullable::Absent,
            Nullable::Null => Nullable::Null,
            Nullable::Value(v) => Nullable::Value(f(v)),
        }
    }
}

impl<T> From<T> for Nullable<T> {
    fn from(value: T) -> Self {
        Nullable::Value(value)
    }
}

impl From<&str> for Nullable<String> {
    fn from(value: &str) -> Self {
        Nullable::Value(value.to_string())
    }
}

impl NullBool {
    /// Decode a textual boolean. Empty text is treated as null.
    pub fn from_text(text: &str) -> Result<Self, FieldError> {
        match text.trim() {
            "" => Ok(Nullable::Null),
            t if t.eq_ignore_ascii_case("true") => Ok(Nullable::Value(true)),
            t if t.eq_ignore_ascii_case("false") => Ok(Nullable::Value(false)),
            _ => Err(FieldError::MalformedBool(text.to_string())),
        }
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Nullable::Value(v) => serializer.serialize_some(v),
            // Absent only reaches here when the container forgot skip_serializing_if.
            Nullable::Absent | Nullable::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Nullable::from_option)
    }
}

/// `#[serde(with = ...)]` adapter for boolean fields that some producers
/// emit as text (`"true"`, `"False"`). Empty text decodes as null.
pub mod text_bool {
    use super::*;
    use serde::de::Error as _;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolInput {
        Bool(bool),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &NullBool, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NullBool, D::Error> {
        match Option::<BoolInput>::deserialize(deserializer)? {
            None => Ok(Nullable::Null),
            Some(BoolInput::Bool(b)) => Ok(Nullable::Value(b)),
            Some(BoolInput::Text(text)) => NullBool::from_text(&text).map_err(D::Error::custom),
        }
    }
}

/// `deserialize_with` adapter for lists whose elements may be `null`.
/// A null element decodes as `T::default()` so the list keeps its length.
pub fn null_items_as_default<'de, D, T>(deserializer: D) -> Result<Nullable<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(Nullable::from_option(
        items.map(|items| items.into_iter().map(Option::unwrap_or_default).collect()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::NullString;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(default, skip_serializing_if = "Nullable::is_absent")]
        name: NullString,
        #[serde(default, skip_serializing_if = "Nullable::is_absent")]
        flag: NullBool,
    }

    fn states(v: &NullString) -> [bool; 3] {
        [v.is_absent(), v.is_null(), v.is_present()]
    }

    #[test]
    fn test_default_is_absent() {
        let sample = Sample::default();
        assert!(sample.name.is_absent());
        assert!(sample.flag.is_absent());
    }

    #[test]
    fn test_predicates_are_exclusive() {
        for v in [NullString::Absent, NullString::Null, NullString::from("")] {
            let s = states(&v);
            assert_eq!(s.iter().filter(|b| **b).count(), 1, "{:?}", v);
        }
    }

    #[test]
    fn test_absent_null_empty_serialize_differently() {
        let absent = serde_json::to_string(&Sample::default()).unwrap();
        let null = Sample {
            name: Nullable::Null,
            ..Default::default()
        };
        let empty = Sample {
            name: "".into(),
            ..Default::default()
        };
        let null = serde_json::to_string(&null).unwrap();
        let empty = serde_json::to_string(&empty).unwrap();

        assert_eq!(absent, "{}");
        assert_eq!(null, r#"{"name":null}"#);
        assert_eq!(empty, r#"{"name":""}"#);
    }

    #[test]
    fn test_deserialize_three_states() {
        let absent: Sample = serde_json::from_str("{}").unwrap();
        let null: Sample = serde_json::from_str(r#"{"name":null}"#).unwrap();
        let empty: Sample = serde_json::from_str(r#"{"name":""}"#).unwrap();

        assert!(absent.name.is_absent());
        assert!(null.name.is_null());
        assert_eq!(empty.name.value().map(String::as_str), Some(""));
        assert_ne!(absent, empty);
        assert_ne!(null, empty);
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let input = r#"{"name":null,"flag":false}"#;
        let first: Sample = serde_json::from_str(input).unwrap();
        let out = serde_json::to_string(&first).unwrap();
        let second: Sample = serde_json::from_str(&out).unwrap();
        assert_eq!(out, serde_json::to_string(&second).unwrap());
        assert_eq!(out, input);
    }

    #[test]
    fn test_value_access_on_missing_does_not_panic() {
        assert_eq!(NullString::Absent.value(), None);
        assert_eq!(NullString::Null.into_value(), None);
    }

    #[test]
    fn test_bool_from_text() {
        assert_eq!(NullBool::from_text("TRUE").unwrap(), Nullable::Value(true));
        assert_eq!(NullBool::from_text("false").unwrap(), Nullable::Value(false));
        assert!(NullBool::from_text("").unwrap().is_null());
        assert!(NullBool::from_text("yes").is_err());
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Flags {
        #[serde(default, skip_serializing_if = "Nullable::is_absent", with = "text_bool")]
        read_only: NullBool,
        #[serde(
            default,
            skip_serializing_if = "Nullable::is_absent",
            deserialize_with = "null_items_as_default"
        )]
        names: Nullable<Vec<String>>,
    }

    #[test]
    fn test_text_bool_accepts_bool_and_text() {
        let from_bool: Flags = serde_json::from_str(r#"{"read_only":true}"#).unwrap();
        let from_text: Flags = serde_json::from_str(r#"{"read_only":"False"}"#).unwrap();
        let from_null: Flags = serde_json::from_str(r#"{"read_only":null}"#).unwrap();
        let from_empty: Flags = serde_json::from_str(r#"{"read_only":""}"#).unwrap();
        let absent: Flags = serde_json::from_str("{}").unwrap();

        assert_eq!(from_bool.read_only, Nullable::Value(true));
        assert_eq!(from_text.read_only, Nullable::Value(false));
        assert!(from_null.read_only.is_null());
        assert!(from_empty.read_only.is_null());
        assert!(absent.read_only.is_absent());
        assert!(serde_json::from_str::<Flags>(r#"{"read_only":"maybe"}"#).is_err());

        // Text input is written back in canonical form
        assert_eq!(serde_json::to_string(&from_text).unwrap(), r#"{"read_only":false}"#);
    }

    #[test]
    fn test_null_items_become_defaults() {
        let flags: Flags = serde_json::from_str(r#"{"names":["a",null,"c"]}"#).unwrap();
        let names = flags.names.into_value().unwrap();
        assert_eq!(names, vec!["a".to_string(), String::new(), "c".to_string()]);

        let null: Flags = serde_json::from_str(r#"{"names":null}"#).unwrap();
        assert!(null.names.is_null());
        let absent: Flags = serde_json::from_str("{}").unwrap();
        assert!(absent.names.is_absent());
    }
}
