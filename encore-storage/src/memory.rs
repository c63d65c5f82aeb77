//! In-memory act store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use encore_core::{ActRecord, ActStamp, EncoreResult, StorageError};

use crate::store::{ActStore, HEALTH_SENTINEL_ID};

/// Act store backed by a sorted map. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryActStore {
    records: RwLock<BTreeMap<String, ActRecord>>,
}

impl InMemoryActStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = ActRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(operation: &str) -> StorageError {
        StorageError::ListFailed {
            reason: format!("in-memory store lock poisoned during {operation}"),
        }
    }

    fn visible(&self) -> EncoreResult<Vec<ActRecord>> {
        let records = self.records.read().map_err(|_| Self::poisoned("list"))?;
        Ok(records
            .values()
            .filter(|record| record.id != HEALTH_SENTINEL_ID)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ActStore for InMemoryActStore {
    async fn get(&self, id: &str) -> EncoreResult<Option<ActRecord>> {
        let records = self.records.read().map_err(|_| StorageError::ReadFailed {
            id: id.to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        Ok(records.get(id).cloned())
    }

    async fn upsert(&self, record: &ActRecord) -> EncoreResult<()> {
        let mut records = self.records.write().map_err(|_| StorageError::WriteFailed {
            id: record.id.clone(),
            reason: "lock poisoned".to_string(),
        })?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> EncoreResult<()> {
        let mut records = self.records.write().map_err(|_| StorageError::DeleteFailed {
            id: id.to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        records.remove(id);
        Ok(())
    }

    async fn list_ids(&self) -> EncoreResult<Vec<String>> {
        Ok(self.visible()?.into_iter().map(|record| record.id).collect())
    }

    async fn list_stamps(&self) -> EncoreResult<Vec<ActStamp>> {
        Ok(self.visible()?.iter().map(ActRecord::stamp).collect())
    }

    async fn list_ids_without_tour_listing(&self) -> EncoreResult<Vec<String>> {
        Ok(self
            .visible()?
            .into_iter()
            .filter(|record| record.tour_listing_url().is_none())
            .map(|record| record.id)
            .collect())
    }
}
