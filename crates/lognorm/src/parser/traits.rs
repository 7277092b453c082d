pub use super::builder::NormalizedRecord;
pub use super::model::ParseError;

pub trait LogParser: Send + Sync {
    /// Parse one raw record (which may frame a batch of events) into results,
    /// in source order. Zero results is a valid outcome.
    fn parse(&self, raw: &str) -> Result<Vec<NormalizedRecord>, ParseError>;
    fn log_type(&self) -> &str;
}
