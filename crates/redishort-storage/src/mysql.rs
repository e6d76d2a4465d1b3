use async_trait::async_trait;
use jiff::Timestamp;
use redishort_core::store::Result;
use redishort_core::{LinkRecord, LinkStore, ShortCode, StorageError};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::trace;

/// MySQL implementation of the link store contract.
///
/// Timestamps are stored as Unix epoch milliseconds so that the values the
/// cache scores with survive a round trip unchanged. The schema lives in
/// `ddl/mysql/short_links.sql`.
#[derive(Debug, Clone)]
pub struct MySqlLinkStore {
    pool: MySqlPool,
}

impl MySqlLinkStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }
}

fn parse_millis(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
    })
}

fn record_from_row(row: &MySqlRow) -> Result<LinkRecord> {
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let target: String = row.try_get("target").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let visit_count: u64 = row.try_get("visit_count").map_err(map_sqlx_error)?;
    let last_visit_at: i64 = row.try_get("last_visit_at").map_err(map_sqlx_error)?;

    Ok(LinkRecord {
        code: ShortCode::new_unchecked(code),
        target,
        created_at: parse_millis("created_at", created_at)?,
        visit_count,
        last_visit_at: parse_millis("last_visit_at", last_visit_at)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        sqlx::Error::Configuration(_) | sqlx::Error::Protocol(_) => {
            StorageError::Operation(message)
        }
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl LinkStore for MySqlLinkStore {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, target, created_at, visit_count, last_visit_at
            FROM short_links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_by_target(&self, target: &str) -> Result<Option<LinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, target, created_at, visit_count, last_visit_at
            FROM short_links
            WHERE target = ?
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(target)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert(&self, record: LinkRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_links (short_code, target, created_at, visit_count, last_visit_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.code.as_str())
        .bind(&record.target)
        .bind(record.created_at.as_millisecond())
        .bind(record.visit_count)
        .bind(record.last_visit_at.as_millisecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn increment_visit(&self, code: &ShortCode, at: Timestamp) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE short_links
            SET visit_count = visit_count + 1,
                last_visit_at = GREATEST(last_visit_at, ?)
            WHERE short_code = ?
            "#,
        )
        .bind(at.as_millisecond())
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            trace!(code = %code, "visit increment matched no row");
        }
        Ok(())
    }
}
