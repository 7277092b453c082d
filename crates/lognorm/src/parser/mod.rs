/// Log parsing and normalization
///
/// Turns raw records of a known log type into immutable, indicator-tagged
/// [`NormalizedRecord`]s.
///
/// # Architecture
///
/// - `traits.rs`: the per-source parser contract
/// - `model.rs`: parse errors, error kinds and dead letters
/// - `builder.rs`: result construction (row ids, event time, indicator merge)
/// - `registry.rs`: log type → parser dispatch
/// - `metrics.rs`: dispatch counters
/// - `formats/`: individual log source parsers
///
/// # Guarantees
///
/// - Results are returned in source order
/// - A batch either yields every record or fails as a whole
/// - Parsers hold no per-call state and are safe to share across threads

pub mod builder;
pub mod formats;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod traits;

pub use builder::{BuildError, NormalizedRecord, ResultBuilder, RowIdGenerator};
pub use model::{DeadLetter, ErrorKind, ParseError};
pub use registry::{DispatchError, Registry, RegistryBuilder, RegistryError};
pub use traits::LogParser;

// Constants
pub const MAX_RECORD_SIZE: usize = 1_048_576; // 1MB
pub const DEAD_LETTER_EXCERPT: usize = 256;
