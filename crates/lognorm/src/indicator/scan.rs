use serde_json::Value;

use super::{IndicatorSet, Recognizers};
use crate::field::RawJson;

/// Offer every string leaf of a JSON tree to the recognizers.
///
/// Independent of any schema; uses an explicit stack so nesting depth is
/// bounded only by what the decoder accepted.
pub fn scan_value(value: &Value, recognizers: &Recognizers, out: &mut IndicatorSet) {
    let mut stack = vec![value];
    while let Some(node) = stack.pop() {
        match node {
            Value::String(s) => recognizers.recognize(s, out),
            Value::Array(items) => stack.extend(items.iter()),
            Value::Object(map) => stack.extend(map.values()),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

/// Decode an embedded blob and scan it. A decode failure leaves `out`
/// untouched and is returned so the caller can report it.
pub fn scan_raw(
    raw: &RawJson,
    recognizers: &Recognizers,
    out: &mut IndicatorSet,
) -> Result<(), serde_json::Error> {
    let value: Value = serde_json::from_str(raw.get())?;
    scan_value(&value, recognizers, out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::IndicatorKind;
    use serde_json::json;

    #[test]
    fn test_scan_nested_leaves() {
        let blob = json!({
            "bucketArn": "arn:aws:s3:::my-bucket",
            "nested": {
                "addresses": ["10.0.0.1", {"peer": "10.0.0.2"}],
                "owner": "123456789012",
                "port": 443,
                "enabled": true
            }
        });
        let mut out = IndicatorSet::new();
        scan_value(&blob, &Recognizers::builtin(), &mut out);

        assert!(out.contains(IndicatorKind::AwsArn, "arn:aws:s3:::my-bucket"));
        assert!(out.contains(IndicatorKind::IpAddress, "10.0.0.1"));
        assert!(out.contains(IndicatorKind::IpAddress, "10.0.0.2"));
        assert!(out.contains(IndicatorKind::AwsAccountId, "123456789012"));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_scan_is_deterministic_and_deduplicates() {
        let raw = RawJson::from_text(
            r#"{"a":"10.0.0.1","b":["10.0.0.1","10.0.0.1"],"c":{"d":"10.0.0.1"}}"#,
        )
        .unwrap();
        let recognizers = Recognizers::builtin();

        let mut first = IndicatorSet::new();
        scan_raw(&raw, &recognizers, &mut first).unwrap();
        let mut second = IndicatorSet::new();
        scan_raw(&raw, &recognizers, &mut second).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_scan_too_deep_yields_nothing() {
        let deep = format!("{}\"10.0.0.1\"{}", "[".repeat(200), "]".repeat(200));
        let raw = RawJson::from_text(deep);
        // Construction may already reject this; if not, the tree decode must.
        if let Ok(raw) = raw {
            let mut out = IndicatorSet::new();
            assert!(scan_raw(&raw, &Recognizers::builtin(), &mut out).is_err());
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_scalar_blob() {
        let raw = RawJson::from_text(r#""arn:aws:sns:us-east-1:123456789012:topic""#).unwrap();
        let mut out = IndicatorSet::new();
        scan_raw(&raw, &Recognizers::builtin(), &mut out).unwrap();
        assert!(out.contains(IndicatorKind::AwsArn, "arn:aws:sns:us-east-1:123456789012:topic"));
        assert!(out.contains(IndicatorKind::AwsAccountId, "123456789012"));
    }
}
