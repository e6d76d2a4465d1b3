//! Bounded, score-ordered cache for link records.
//!
//! [`ScoredCache`] keeps two indices in lockstep: a hash index from short
//! code to record, and an ordered index from score to short code. The
//! ordered index makes the lowest-ranked record available in `O(log n)`,
//! which is what the admission and eviction policy needs once the cache is
//! full. How a record is ranked is decided by a pluggable [`ScorePolicy`].

pub mod error;
pub mod policy;
pub mod scored;
pub mod stats;

pub use error::{CacheError, Result};
pub use policy::{LogRecencyScore, ScorePolicy};
pub use scored::{Admission, CacheConfig, ScoredCache};
pub use stats::CacheStats;
