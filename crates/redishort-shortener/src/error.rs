use redishort_core::StorageError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// The generated code is already taken by another record. The existing
    /// record is left untouched.
    #[error("generated short code collides with an existing one: {0}")]
    CodeCollision(String),
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict(code) => Self::CodeCollision(code),
            other => Self::Storage(other),
        }
    }
}
