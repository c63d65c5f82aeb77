//! LMDB-backed act store.
//!
//! Uses the heed crate (Rust bindings for LMDB). Records live in a single
//! named database `acts`, keyed by act id, with the JSON-encoded record as
//! value. LMDB keeps keys in byte order, which gives the ascending listings
//! the [`ActStore`] contract asks for.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. Reads use read transactions; `upsert`
//! and `delete` each run in their own write transaction.

use std::path::Path;

use async_trait::async_trait;
use encore_core::{ActRecord, ActStamp, EncoreError, EncoreResult, StorageError};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::store::{ActStore, HEALTH_SENTINEL_ID};

const DATABASE_NAME: &str = "acts";

/// Error type for LMDB store setup and transactions.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for EncoreError {
    fn from(e: LmdbStoreError) -> Self {
        EncoreError::Storage(StorageError::Open {
            reason: e.to_string(),
        })
    }
}

/// Persistent act store.
pub struct LmdbActStore {
    env: Env,
    db: Database<Str, Bytes>,
}

impl LmdbActStore {
    /// Open (or create) a store under `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per directory by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some(DATABASE_NAME))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }

    /// Visit every entry except the health sentinel, in key order.
    fn for_each_entry<F>(&self, mut visit: F) -> EncoreResult<()>
    where
        F: FnMut(&str, &[u8]),
    {
        let list_failed = |e: heed::Error| StorageError::ListFailed {
            reason: e.to_string(),
        };

        let rtxn = self.env.read_txn().map_err(list_failed)?;
        let iter = self.db.iter(&rtxn).map_err(list_failed)?;

        for entry in iter {
            let (key, bytes) = entry.map_err(list_failed)?;
            if key != HEALTH_SENTINEL_ID {
                visit(key, bytes);
            }
        }
        Ok(())
    }

    /// Decode every record, skipping entries that no longer decode.
    fn scan(&self) -> EncoreResult<Vec<ActRecord>> {
        let mut records = Vec::new();
        self.for_each_entry(|key, bytes| match serde_json::from_slice::<ActRecord>(bytes) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(act_id = %key, error = %e, "Skipping undecodable cached act");
            }
        })?;
        Ok(records)
    }
}

#[async_trait]
impl ActStore for LmdbActStore {
    async fn get(&self, id: &str) -> EncoreResult<Option<ActRecord>> {
        let read_failed = |e: heed::Error| StorageError::ReadFailed {
            id: id.to_string(),
            reason: e.to_string(),
        };

        let rtxn = self.env.read_txn().map_err(read_failed)?;
        match self.db.get(&rtxn, id).map_err(read_failed)? {
            Some(bytes) => {
                let record = serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupt {
                    id: id.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn upsert(&self, record: &ActRecord) -> EncoreResult<()> {
        let write_failed = |reason: String| StorageError::WriteFailed {
            id: record.id.clone(),
            reason,
        };

        let bytes = serde_json::to_vec(record).map_err(|e| write_failed(e.to_string()))?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| write_failed(e.to_string()))?;
        self.db
            .put(&mut wtxn, &record.id, &bytes)
            .map_err(|e| write_failed(e.to_string()))?;
        wtxn.commit().map_err(|e| write_failed(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> EncoreResult<()> {
        let delete_failed = |e: heed::Error| StorageError::DeleteFailed {
            id: id.to_string(),
            reason: e.to_string(),
        };

        let mut wtxn = self.env.write_txn().map_err(delete_failed)?;
        self.db.delete(&mut wtxn, id).map_err(delete_failed)?;
        wtxn.commit().map_err(delete_failed)?;
        Ok(())
    }

    async fn list_ids(&self) -> EncoreResult<Vec<String>> {
        let mut ids = Vec::new();
        self.for_each_entry(|key, _| ids.push(key.to_string()))?;
        Ok(ids)
    }

    /// Only the id and timestamp are decoded. An entry that does not even
    /// yield those is reported without a timestamp, so it counts as stale
    /// and the next refresh rewrites it.
    async fn list_stamps(&self) -> EncoreResult<Vec<ActStamp>> {
        let mut stamps = Vec::new();
        self.for_each_entry(|key, bytes| {
            let stamp = match serde_json::from_slice::<ActStamp>(bytes) {
                Ok(stamp) => stamp,
                Err(e) => {
                    tracing::warn!(act_id = %key, error = %e, "Cached act has no readable timestamp");
                    ActStamp {
                        id: key.to_string(),
                        updated_at: None,
                    }
                }
            };
            stamps.push(stamp);
        })?;
        Ok(stamps)
    }

    async fn list_ids_without_tour_listing(&self) -> EncoreResult<Vec<String>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|record| record.tour_listing_url().is_none())
            .map(|record| record.id)
            .collect())
    }
}
