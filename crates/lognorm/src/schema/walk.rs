use tracing::warn;

use crate::field::{NullTime, Nullable};
use crate::indicator::{scan_raw, IndicatorSet, Recognizers};

use super::{Event, FieldRef, FieldSpec, Schema, Violation};

enum Segment {
    Field(&'static str),
    Index(usize),
}

/// Depth-first visitor over an event tree.
///
/// Collects every violation (no short-circuit), statically tagged indicators,
/// dynamically recognized indicators (when recognizers are supplied) and the
/// top-level event time.
pub struct Walker<'r> {
    recognizers: Option<&'r Recognizers>,
    path: Vec<Segment>,
    violations: Vec<Violation>,
    indicators: IndicatorSet,
    event_time: NullTime,
    warnings: usize,
}

/// Everything one walk learned about an event.
#[derive(Debug, Default)]
pub struct Inspection {
    pub violations: Vec<Violation>,
    pub indicators: IndicatorSet,
    pub event_time: NullTime,
    /// Embedded blobs that could not be scanned
    pub warnings: usize,
}

impl Inspection {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

impl Walker<'static> {
    pub fn validating() -> Self {
        Walker::new(None)
    }
}

impl<'r> Walker<'r> {
    pub fn extracting(recognizers: &'r Recognizers) -> Self {
        Walker::new(Some(recognizers))
    }

    fn new(recognizers: Option<&'r Recognizers>) -> Self {
        Self {
            recognizers,
            path: Vec::with_capacity(8),
            violations: Vec::new(),
            indicators: IndicatorSet::new(),
            event_time: Nullable::Absent,
            warnings: 0,
        }
    }

    pub fn walk<T>(&mut self, schema: &Schema<T>, event: &T) {
        for spec in schema.fields() {
            self.path.push(Segment::Field(spec.name()));
            self.visit(spec, spec.get(event));
            self.path.pop();
        }
    }

    fn visit<T>(&mut self, spec: &FieldSpec<T>, value: FieldRef<'_>) {
        for rule in spec.rules() {
            if let Some(message) = rule.check(&value) {
                self.violations.push(Violation {
                    field: self.path_string(),
                    rule: rule.name(),
                    message,
                });
            }
        }

        match value {
            FieldRef::String(s) => {
                if let (Some(kind), Some(v)) = (spec.indicator_kind(), s.value()) {
                    if kind.accepts(v) {
                        self.indicators.insert(kind, v);
                    }
                }
            }
            FieldRef::Time(t) => {
                if spec.is_event_time() && self.path.len() == 1 {
                    self.event_time = t.clone();
                }
            }
            FieldRef::Raw(raw) => {
                if let (Some(recognizers), Some(raw)) = (self.recognizers, raw.value()) {
                    if let Err(e) = scan_raw(raw, recognizers, &mut self.indicators) {
                        self.warnings += 1;
                        warn!(
                            field = %self.path_string(),
                            error = %e,
                            "Skipping indicator scan of malformed embedded JSON"
                        );
                    }
                }
            }
            FieldRef::Struct(Nullable::Value(nested)) => nested.walk(self),
            FieldRef::List(Nullable::Value(items)) => {
                for (i, item) in items.into_iter().enumerate() {
                    self.path.push(Segment::Index(i));
                    item.walk(self);
                    self.path.pop();
                }
            }
            FieldRef::Bool(_) | FieldRef::Struct(_) | FieldRef::List(_) => {}
        }
    }

    fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                Segment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                Segment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    pub fn finish(self) -> Inspection {
        Inspection {
            violations: self.violations,
            indicators: self.indicators,
            event_time: self.event_time,
            warnings: self.warnings,
        }
    }
}

/// Check every declared constraint. An empty result means the event is valid.
pub fn validate(event: &dyn Event) -> Vec<Violation> {
    let mut walker = Walker::validating();
    event.walk(&mut walker);
    walker.finish().violations
}

/// Validate, extract indicators and capture the event time in one pass.
pub fn inspect(event: &dyn Event, recognizers: &Recognizers) -> Inspection {
    let mut walker = Walker::extracting(recognizers);
    event.walk(&mut walker);
    walker.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{NullRaw, NullString, RawJson};
    use crate::indicator::IndicatorKind;
    use crate::schema::{Rule, Schematic};
    use chrono::TimeZone;
    use std::sync::LazyLock;

    #[derive(Default)]
    struct Inner {
        arn: NullString,
        code: NullString,
        at: NullTime,
    }

    #[derive(Default)]
    struct Outer {
        id: NullString,
        account: NullString,
        state: NullString,
        at: NullTime,
        blob: NullRaw,
        inner: Nullable<Box<Inner>>,
        items: Nullable<Vec<Inner>>,
    }

    impl Schematic for Inner {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: LazyLock<Schema<Inner>> = LazyLock::new(|| {
                type Spec = FieldSpec<Inner>;
                Schema::new("Inner")
                    .field(
                        Spec::new("arn", |e| FieldRef::String(&e.arn))
                            .indicator(IndicatorKind::AwsArn),
                    )
                    .field(
                        Spec::new("code", |e| FieldRef::String(&e.code))
                            .rule(Rule::pattern("[A-Z]{3}").expect("valid pattern")),
                    )
                    // Ignored: event time is only taken from the top level.
                    .field(Spec::new("at", |e| FieldRef::Time(&e.at)).event_time())
            });
            &SCHEMA
        }
    }

    impl Schematic for Outer {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: LazyLock<Schema<Outer>> = LazyLock::new(|| {
                type Spec = FieldSpec<Outer>;
                Schema::new("Outer")
                    .field(Spec::new("id", |e| FieldRef::String(&e.id)).required())
                    .field(
                        Spec::new("account", |e| FieldRef::String(&e.account))
                            .rule(Rule::Len(12))
                            .rule(Rule::Numeric)
                            .indicator(IndicatorKind::AwsAccountId),
                    )
                    .field(
                        Spec::new("state", |e| FieldRef::String(&e.state))
                            .rule(Rule::OneOf(&["on", "off"])),
                    )
                    .field(Spec::new("at", |e| FieldRef::Time(&e.at)).required().event_time())
                    .field(Spec::new("blob", |e| FieldRef::Raw(&e.blob)))
                    .field(Spec::new("inner", |e| FieldRef::nested(&e.inner)).required())
                    .field(Spec::new("items", |e| FieldRef::list(&e.items)))
            });
            &SCHEMA
        }
    }

    fn valid() -> Outer {
        Outer {
            id: "E1".into(),
            account: "123456789012".into(),
            state: "on".into(),
            at: Nullable::Value(chrono::Utc.timestamp_opt(1_577_836_800, 0).unwrap()),
            blob: Nullable::Value(RawJson::from_text(r#"{"peer":"10.0.0.9"}"#).unwrap()),
            inner: Nullable::Value(Box::new(Inner {
                arn: "arn:aws:iam::123456789012:user/alice".into(),
                code: "ABC".into(),
                at: Nullable::Value(chrono::Utc.timestamp_opt(0, 0).unwrap()),
            })),
            items: Nullable::Value(vec![
                Inner::default(),
                Inner {
                    arn: NullString::Null,
                    code: "xyz".into(),
                    at: Nullable::Absent,
                },
            ]),
        }
    }

    #[test]
    fn test_valid_event_has_no_violations() {
        let mut event = valid();
        event.items = Nullable::Absent;
        assert!(validate(&event).is_empty());
    }

    #[test]
    fn test_violations_are_collected_not_short_circuited() {
        let mut event = valid();
        event.id = Nullable::Absent;
        event.account = "12AB56789012".into();
        event.state = "maybe".into();
        event.inner = Nullable::Null;

        let violations = validate(&event);
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&"id"));
        assert!(fields.contains(&"account"));
        assert!(fields.contains(&"state"));
        assert!(fields.contains(&"inner"));
        assert!(fields.contains(&"items[1].code"));
    }

    #[test]
    fn test_missing_required_field_is_named() {
        let mut event = valid();
        event.at = Nullable::Null;
        let violations = validate(&event);
        assert!(violations.iter().any(|v| v.field == "at" && v.rule == "required"));
    }

    #[test]
    fn test_inspect_collects_static_and_dynamic_indicators() {
        let inspection = inspect(&valid(), &Recognizers::builtin());
        let ind = &inspection.indicators;

        assert!(ind.contains(IndicatorKind::AwsAccountId, "123456789012"));
        assert!(ind.contains(IndicatorKind::AwsArn, "arn:aws:iam::123456789012:user/alice"));
        assert!(ind.contains(IndicatorKind::IpAddress, "10.0.0.9"));
        assert_eq!(inspection.warnings, 0);
    }

    #[test]
    fn test_event_time_comes_from_top_level_only() {
        let inspection = inspect(&valid(), &Recognizers::builtin());
        assert_eq!(inspection.event_time.value().unwrap().timestamp(), 1_577_836_800);
        assert_eq!(Outer::default().event_time_field(), Some("at"));
    }

    #[test]
    fn test_validation_walk_skips_dynamic_scan() {
        let mut walker = Walker::validating();
        valid().walk(&mut walker);
        let inspection = walker.finish();
        assert!(!inspection.indicators.contains(IndicatorKind::IpAddress, "10.0.0.9"));
    }

    #[test]
    fn test_inspect_does_not_mutate_event() {
        let event = valid();
        let before = event.id.clone();
        let _ = inspect(&event, &Recognizers::builtin());
        assert_eq!(event.id, before);
    }
}
