use std::fmt;

use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};

use super::{FieldRef, SchemaError};

/// A declarative constraint attached to a field.
///
/// `Required` fails on absent or null values. The format rules (`Len`,
/// `Numeric`, `Pattern`, `OneOf`) only apply to present, non-empty strings,
/// so an optional field may be omitted or left empty without violating them.
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    /// Exact length in characters
    Len(usize),
    /// ASCII digits only
    Numeric,
    Pattern(Pattern),
    OneOf(&'static [&'static str]),
}

/// A compiled pattern that must match the entire value.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    matcher: RegexMatcher,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, SchemaError> {
        let matcher = RegexMatcherBuilder::new()
            .multi_line(false)
            .build(&format!("^(?:{})$", pattern))
            .map_err(|e| SchemaError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn is_match(&self, value: &str) -> bool {
        self.matcher.is_match(value.as_bytes()).unwrap_or(false)
    }
}

impl Rule {
    pub fn pattern(pattern: &str) -> Result<Self, SchemaError> {
        Pattern::new(pattern).map(Rule::Pattern)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Len(_) => "len",
            Rule::Numeric => "numeric",
            Rule::Pattern(_) => "pattern",
            Rule::OneOf(_) => "one_of",
        }
    }

    /// Returns a failure message, or `None` if the value satisfies the rule.
    pub fn check(&self, value: &FieldRef<'_>) -> Option<String> {
        if let Rule::Required = self {
            return value.is_missing().then(|| "is required".to_string());
        }

        let text = match value {
            FieldRef::String(s) => s.value().map(String::as_str).filter(|s| !s.is_empty())?,
            _ => return None,
        };

        match self {
            Rule::Required => None,
            Rule::Len(n) => (text.chars().count() != *n)
                .then(|| format!("must be exactly {} characters", n)),
            Rule::Numeric => (!text.bytes().all(|b| b.is_ascii_digit()))
                .then(|| "must be numeric".to_string()),
            Rule::Pattern(p) => (!p.is_match(text))
                .then(|| format!("must match {}", p.as_str())),
            Rule::OneOf(allowed) => (!allowed.contains(&text))
                .then(|| format!("must be one of {}", allowed.join(", "))),
        }
    }
}

/// A single failed constraint, located by its dotted field path
/// (`userIdentity.sessionContext.sessionIssuer.arn`, `resources[2].type`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}
