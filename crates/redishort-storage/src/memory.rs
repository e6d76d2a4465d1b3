use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use redishort_core::store::Result;
use redishort_core::{LinkRecord, LinkStore, ShortCode, StorageError};

/// In-memory implementation of [`LinkStore`] using DashMap.
///
/// Records are keyed by short code; a second map from long URL to the first
/// code created for it serves `find_by_target`.
#[derive(Debug, Default)]
pub struct InMemoryLinkStore {
    by_code: DashMap<ShortCode, LinkRecord>,
    by_target: DashMap<String, ShortCode>,
}

impl InMemoryLinkStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        Ok(self.by_code.get(code).map(|entry| entry.value().clone()))
    }

    async fn find_by_target(&self, target: &str) -> Result<Option<LinkRecord>> {
        let Some(code) = self.by_target.get(target).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        Ok(self.by_code.get(&code).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, record: LinkRecord) -> Result<()> {
        let code = record.code.clone();
        let target = record.target.clone();

        match self.by_code.entry(code.clone()) {
            Entry::Occupied(_) => return Err(StorageError::Conflict(code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        self.by_target.entry(target).or_insert(code);
        Ok(())
    }

    async fn increment_visit(&self, code: &ShortCode, at: Timestamp) -> Result<()> {
        if let Some(mut record) = self.by_code.get_mut(code) {
            record.record_visit(at);
        }
        Ok(())
    }
}
