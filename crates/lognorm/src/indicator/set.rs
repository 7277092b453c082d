use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::IndicatorKind;

/// Deduplicated indicators grouped by kind.
///
/// Both levels are ordered, so serialization is stable regardless of the
/// order in which values were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorSet {
    values: BTreeMap<IndicatorKind, BTreeSet<String>>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Empty values are ignored. Returns `true` if the
    /// `(kind, value)` pair was not already present.
    pub fn insert(&mut self, kind: IndicatorKind, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        let entry = self.values.entry(kind).or_default();
        if entry.contains(value) {
            return false;
        }
        entry.insert(value.to_string())
    }

    pub fn merge(&mut self, other: IndicatorSet) {
        for (kind, values) in other.values {
            self.values.entry(kind).or_default().extend(values);
        }
    }

    pub fn get(&self, kind: IndicatorKind) -> Option<&BTreeSet<String>> {
        self.values.get(&kind)
    }

    pub fn contains(&self, kind: IndicatorKind, value: &str) -> bool {
        self.values.get(&kind).is_some_and(|v| v.contains(value))
    }

    /// Total number of `(kind, value)` pairs.
    pub fn len(&self) -> usize {
        self.values.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndicatorKind, &str)> {
        self.values
            .iter()
            .flat_map(|(kind, values)| values.iter().map(move |v| (*kind, v.as_str())))
    }

    /// Write each non-empty kind as a `p_any_*` entry into an open map.
    pub(crate) fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        for (kind, values) in &self.values {
            if !values.is_empty() {
                map.serialize_entry(kind.field_name(), values)?;
            }
        }
        Ok(())
    }
}

impl Serialize for IndicatorSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let populated = self.values.values().filter(|v| !v.is_empty()).count();
        let mut map = serializer.serialize_map(Some(populated))?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for IndicatorSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = IndicatorSet;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of p_any_* fields to string arrays")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut set = IndicatorSet::new();
                while let Some(key) = map.next_key::<String>()? {
                    match IndicatorKind::from_field_name(&key) {
                        Some(kind) => {
                            for value in map.next_value::<Vec<String>>()? {
                                set.insert(kind, &value);
                            }
                        }
                        None => {
                            map.next_value::<serde::de::IgnoredAny>()?;
                        }
                    }
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let mut set = IndicatorSet::new();
        assert!(set.insert(IndicatorKind::IpAddress, "10.0.0.1"));
        assert!(!set.insert(IndicatorKind::IpAddress, "10.0.0.1"));
        assert!(set.insert(IndicatorKind::AwsAccountId, "123456789012"));
        assert!(!set.insert(IndicatorKind::AwsArn, ""));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serialization_is_order_independent() {
        let mut a = IndicatorSet::new();
        a.insert(IndicatorKind::IpAddress, "10.0.0.2");
        a.insert(IndicatorKind::AwsArn, "arn:aws:s3:::b");
        a.insert(IndicatorKind::IpAddress, "10.0.0.1");

        let mut b = IndicatorSet::new();
        b.insert(IndicatorKind::IpAddress, "10.0.0.1");
        b.insert(IndicatorKind::IpAddress, "10.0.0.2");
        b.insert(IndicatorKind::AwsArn, "arn:aws:s3:::b");

        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, serde_json::to_string(&b).unwrap());
        assert_eq!(
            json,
            r#"{"p_any_ip_addresses":["10.0.0.1","10.0.0.2"],"p_any_aws_arns":["arn:aws:s3:::b"]}"#
        );
    }

    #[test]
    fn test_merge_and_deserialize() {
        let mut a = IndicatorSet::new();
        a.insert(IndicatorKind::IpAddress, "10.0.0.1");
        let mut b = IndicatorSet::new();
        b.insert(IndicatorKind::IpAddress, "10.0.0.1");
        b.insert(IndicatorKind::AwsInstanceId, "i-0123456789abcdef0");
        a.merge(b);
        assert_eq!(a.len(), 2);

        let json = serde_json::to_string(&a).unwrap();
        let back: IndicatorSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_iter_yields_pairs() {
        let mut set = IndicatorSet::new();
        set.insert(IndicatorKind::AwsArn, "arn:aws:iam::123456789012:root");
        let pairs: Vec<_> = set.iter().collect();
        assert_eq!(pairs, vec![(IndicatorKind::AwsArn, "arn:aws:iam::123456789012:root")]);
    }
}
