use crate::error::StorageError;
use crate::record::LinkRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for link store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The authoritative, persisted mapping of short codes to link records.
///
/// The redirect path only needs `find_by_code` and `increment_visit`; the
/// shortening path additionally dedupes with `find_by_target` and creates
/// records with `insert`.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Retrieves the record for a given short code.
    ///
    /// Returns `Ok(None)` if the code does not exist. Transport failures are
    /// reported as [`StorageError::Unavailable`] or [`StorageError::Timeout`].
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>>;

    /// Retrieves the record that was created for a given long URL, if any.
    async fn find_by_target(&self, target: &str) -> Result<Option<LinkRecord>>;

    /// Inserts a new record.
    ///
    /// Returns `Err(StorageError::Conflict)` if the code already exists; an
    /// existing record is never overwritten.
    async fn insert(&self, record: LinkRecord) -> Result<()>;

    /// Records one visit: `visit_count += 1` and `last_visit_at` moves to `at`
    /// unless it is already later.
    ///
    /// Incrementing an unknown code is not an error.
    async fn increment_visit(&self, code: &ShortCode, at: Timestamp) -> Result<()>;
}

#[async_trait]
impl<T: LinkStore> LinkStore for std::sync::Arc<T> {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        (**self).find_by_code(code).await
    }

    async fn find_by_target(&self, target: &str) -> Result<Option<LinkRecord>> {
        (**self).find_by_target(target).await
    }

    async fn insert(&self, record: LinkRecord) -> Result<()> {
        (**self).insert(record).await
    }

    async fn increment_visit(&self, code: &ShortCode, at: Timestamp) -> Result<()> {
        (**self).increment_visit(code, at).await
    }
}
