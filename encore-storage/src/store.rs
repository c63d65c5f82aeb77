//! The cache store trait.

use async_trait::async_trait;
use encore_core::{ActRecord, ActStamp, ActStatus, EncoreResult};

/// Id written and removed again by [`ActStore::probe_health`].
///
/// Listings never return it, so a probe that fails half way cannot leak a
/// fake act into the background refresh loops.
pub const HEALTH_SENTINEL_ID: &str = "__encore_health_probe__";

/// The record written by a health probe.
pub fn sentinel_record() -> ActRecord {
    ActRecord::new(HEALTH_SENTINEL_ID, "health probe", ActStatus::Unknown)
}

/// Key-value persistence for act records, keyed by act id.
///
/// Implementations must be safe to share across tasks. Listings are sorted
/// ascending by id.
#[async_trait]
pub trait ActStore: Send + Sync {
    /// Fetch one record. `Ok(None)` is a cache miss.
    async fn get(&self, id: &str) -> EncoreResult<Option<ActRecord>>;

    /// Insert or replace the record stored under `record.id`.
    async fn upsert(&self, record: &ActRecord) -> EncoreResult<()>;

    /// Remove a record. Removing a missing id is not an error.
    async fn delete(&self, id: &str) -> EncoreResult<()>;

    /// All cached act ids.
    async fn list_ids(&self) -> EncoreResult<Vec<String>>;

    /// All cached act ids with their `updatedAt` stamps.
    async fn list_stamps(&self) -> EncoreResult<Vec<ActStamp>>;

    /// Ids of cached acts that have no tour-listing relation.
    async fn list_ids_without_tour_listing(&self) -> EncoreResult<Vec<String>>;

    /// Write and delete the sentinel record.
    async fn probe_health(&self) -> EncoreResult<()> {
        self.upsert(&sentinel_record()).await?;
        self.delete(HEALTH_SENTINEL_ID).await
    }
}
