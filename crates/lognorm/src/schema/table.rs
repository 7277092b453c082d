use crate::field::{NullBool, NullRaw, NullString, NullTime, Nullable};
use crate::indicator::IndicatorKind;

use super::{Rule, Walker};

/// A borrowed view of one field value, as seen by the walk.
pub enum FieldRef<'a> {
    String(&'a NullString),
    Bool(&'a NullBool),
    Time(&'a NullTime),
    Raw(&'a NullRaw),
    Struct(Nullable<&'a dyn Event>),
    List(Nullable<Vec<&'a dyn Event>>),
}

impl<'a> FieldRef<'a> {
    pub fn nested<T: Event>(value: &'a Nullable<Box<T>>) -> Self {
        FieldRef::Struct(value.as_ref().map(|boxed| &**boxed as &dyn Event))
    }

    pub fn list<T: Event>(value: &'a Nullable<Vec<T>>) -> Self {
        FieldRef::List(
            value
                .as_ref()
                .map(|items| items.iter().map(|item| item as &dyn Event).collect()),
        )
    }

    /// Absent or null.
    pub fn is_missing(&self) -> bool {
        match self {
            FieldRef::String(v) => v.is_missing(),
            FieldRef::Bool(v) => v.is_missing(),
            FieldRef::Time(v) => v.is_missing(),
            FieldRef::Raw(v) => v.is_missing(),
            FieldRef::Struct(v) => v.is_missing(),
            FieldRef::List(v) => v.is_missing(),
        }
    }
}

/// One row of a schema table.
pub struct FieldSpec<T> {
    name: &'static str,
    get: for<'a> fn(&'a T) -> FieldRef<'a>,
    rules: Vec<Rule>,
    indicator: Option<IndicatorKind>,
    event_time: bool,
}

impl<T> FieldSpec<T> {
    pub fn new(name: &'static str, get: for<'a> fn(&'a T) -> FieldRef<'a>) -> Self {
        Self {
            name,
            get,
            rules: Vec::new(),
            indicator: None,
            event_time: false,
        }
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn indicator(mut self, kind: IndicatorKind) -> Self {
        self.indicator = Some(kind);
        self
    }

    /// Marks this field as the event-time source. Only honored on top-level
    /// time fields.
    pub fn event_time(mut self) -> Self {
        self.event_time = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get<'a>(&self, event: &'a T) -> FieldRef<'a> {
        (self.get)(event)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn indicator_kind(&self) -> Option<IndicatorKind> {
        self.indicator
    }

    pub fn is_event_time(&self) -> bool {
        self.event_time
    }
}

/// The schema table of one event type. Built once (typically in a
/// `LazyLock`) and shared read-only afterwards.
pub struct Schema<T> {
    name: &'static str,
    fields: Vec<FieldSpec<T>>,
}

impl<T> Schema<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec<T>) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldSpec<T>] {
        &self.fields
    }

    pub fn event_time_field(&self) -> Option<&'static str> {
        self.fields.iter().find(|f| f.event_time).map(|f| f.name)
    }
}

/// Anything the walk can descend into.
pub trait Event: Send + Sync {
    fn walk(&self, walker: &mut Walker<'_>);

    /// Name of the top-level field marked as the event-time source.
    fn event_time_field(&self) -> Option<&'static str>;
}

/// Implemented by event structs that describe themselves with a schema
/// table. Every `Schematic` type is an [`Event`].
pub trait Schematic: Sized + Send + Sync + 'static {
    fn schema() -> &'static Schema<Self>;
}

impl<T: Schematic> Event for T {
    fn walk(&self, walker: &mut Walker<'_>) {
        walker.walk(T::schema(), self);
    }

    fn event_time_field(&self) -> Option<&'static str> {
        T::schema().event_time_field()
    }
}
