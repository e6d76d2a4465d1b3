use redishort_core::ShortCode;
use thiserror::Error;

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The key index and the score index disagreed about a code. The entry
    /// has already been dropped from both indices when this is returned.
    #[error("cache indices disagree for short code {0}")]
    InvariantViolation(ShortCode),
}
