/// Individual log source parsers

pub mod cloudtrail;

pub use cloudtrail::CloudTrailParser;

use super::{LogParser, ResultBuilder};

/// Constructs a parser around the result builder it should use.
pub type ParserFactory = fn(ResultBuilder) -> Box<dyn LogParser>;

/// Every parser shipped with the crate, keyed by log type.
pub const BUILTIN: &[(&str, ParserFactory)] =
    &[(cloudtrail::LOG_TYPE, cloudtrail_parser as ParserFactory)];

fn cloudtrail_parser(builder: ResultBuilder) -> Box<dyn LogParser> {
    Box::new(CloudTrailParser::with_builder(builder))
}

pub fn lookup(log_type: &str) -> Option<ParserFactory> {
    BUILTIN
        .iter()
        .find(|(name, _)| *name == log_type)
        .map(|&(_, factory)| factory)
}

pub fn builtin_log_types() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|&(name, _)| name)
}
