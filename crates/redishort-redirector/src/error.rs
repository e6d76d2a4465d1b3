use redishort_core::StorageError;
use thiserror::Error;

/// Result type for redirect resolution.
pub type Result<T> = std::result::Result<T, RedirectorError>;

#[derive(Debug, Clone, Error)]
pub enum RedirectorError {
    /// The link store could not answer the lookup. This is not the same as
    /// the code being unknown, which is [`Resolution::NotFound`].
    ///
    /// [`Resolution::NotFound`]: crate::Resolution::NotFound
    #[error("link store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),
}
