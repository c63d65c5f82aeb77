//! Read-through cache service
//!
//! Serves act records cache-first. Single reads enrich synchronously on a
//! miss; bulk reads with more than one miss hand the missing ids to the
//! background refresher and ask the caller to come back later.
//!
//! Cache writes after a miss are detached: the response never waits for
//! them, and a failed write only clears the [`CacheHealth`] flag. While the
//! flag is cleared every read first has to pass a store health probe.

use encore_core::{
    is_stale, ActRecord, CacheHealth, EncoreError, EncoreResult, ServiceCode, ServiceError,
    ValidationError,
};
use encore_storage::{with_timeout, ActStore};
use futures_util::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::enrichment::{Enricher, EventFailure};
use crate::config::env_or;
use crate::constants::DEFAULT_CACHE_READ_TIMEOUT_MS;
use crate::telemetry::metrics;

// ============================================================================
// SEAMS
// ============================================================================

/// Receives act ids that should be refreshed in the background.
///
/// Implementations must return immediately.
pub trait RefreshScheduler: Send + Sync {
    fn schedule_refresh(&self, ids: Vec<String>);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ActServiceConfig {
    /// Bound on one cache read or health probe.
    pub read_timeout: Duration,
}

impl Default for ActServiceConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DEFAULT_CACHE_READ_TIMEOUT_MS),
        }
    }
}

impl ActServiceConfig {
    /// Create ActServiceConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ENCORE_CACHE_READ_TIMEOUT_MS`: Cache read bound (default: 5000)
    pub fn from_env() -> Self {
        Self {
            read_timeout: Duration::from_millis(env_or(
                "ENCORE_CACHE_READ_TIMEOUT_MS",
                DEFAULT_CACHE_READ_TIMEOUT_MS,
            )),
        }
    }
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

/// Result of a bulk read: either every requested act, or a retry notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BulkLookup {
    Complete { acts: Vec<ActRecord> },
    Pending { error: PendingFetch },
}

/// Retry notice returned when several acts had to be fetched in background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFetch {
    pub message: String,
    pub missing_count: usize,
    pub cached_count: usize,
}

impl PendingFetch {
    pub fn new(missing_count: usize, cached_count: usize) -> Self {
        Self {
            message: format!(
                "{} acts not cached. Background fetch initiated. Please try again in a few minutes.",
                missing_count
            ),
            missing_count,
            cached_count,
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct ActService {
    store: Arc<dyn ActStore>,
    enricher: Enricher,
    scheduler: Arc<dyn RefreshScheduler>,
    health: Arc<CacheHealth>,
    config: ActServiceConfig,
}

impl ActService {
    pub fn new(
        store: Arc<dyn ActStore>,
        enricher: Enricher,
        scheduler: Arc<dyn RefreshScheduler>,
        health: Arc<CacheHealth>,
        config: ActServiceConfig,
    ) -> Self {
        Self {
            store,
            enricher,
            scheduler,
            health,
            config,
        }
    }

    pub fn health(&self) -> &Arc<CacheHealth> {
        &self.health
    }

    /// Read one act, enriching and caching it on a miss.
    ///
    /// Cache read errors propagate unchanged; upstream is never consulted
    /// when the cache itself fails.
    pub async fn get_one(&self, id: &str) -> EncoreResult<ActRecord> {
        self.ensure_cache_healthy().await?;

        match self.read(id).await? {
            Some(record) => Ok(record),
            None => {
                let record = self.enricher.enrich(id, EventFailure::Propagate).await?;
                self.write_detached(record.clone());
                Ok(record)
            }
        }
    }

    /// Read many acts at once.
    ///
    /// Any cache read error fails the whole call with `SVC_002`. Stale hits
    /// are scheduled for refresh without affecting the response.
    pub async fn get_many(&self, ids: &[String]) -> EncoreResult<BulkLookup> {
        if ids.is_empty() {
            return Err(ValidationError::EmptyIdList.into());
        }

        self.ensure_cache_healthy().await?;

        let cached = try_join_all(ids.iter().map(|id| self.read(id)))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, requested = ids.len(), "Bulk cache read failed");
                EncoreError::from(ServiceError::unavailable(
                    ServiceCode::CacheReadFailed,
                    format!("Cache read failed: {}", e),
                ))
            })?;

        let mut missing = Vec::new();
        let mut stale = Vec::new();
        for (id, entry) in ids.iter().zip(&cached) {
            match entry {
                Some(record) if is_stale(record.updated_at.as_deref()) => stale.push(id.clone()),
                Some(_) => {}
                None => missing.push(id.clone()),
            }
        }

        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "Scheduling refresh of stale cached acts");
            self.scheduler.schedule_refresh(stale);
        }

        match missing.len() {
            0 => Ok(BulkLookup::Complete {
                acts: cached.into_iter().flatten().collect(),
            }),
            1 => {
                let fresh = self.enricher.enrich(&missing[0], EventFailure::Propagate).await?;
                self.write_detached(fresh.clone());
                let acts = cached
                    .into_iter()
                    .map(|entry| entry.unwrap_or_else(|| fresh.clone()))
                    .collect();
                Ok(BulkLookup::Complete { acts })
            }
            missing_count => {
                let cached_count = ids.len() - missing_count;
                tracing::info!(missing_count, cached_count, "Deferring uncached acts to background fetch");
                self.scheduler.schedule_refresh(missing);
                Ok(BulkLookup::Pending {
                    error: PendingFetch::new(missing_count, cached_count),
                })
            }
        }
    }

    /// Ids of cached acts without a tour-listing relation.
    pub async fn acts_without_tour_listing(&self) -> EncoreResult<Vec<String>> {
        self.ensure_cache_healthy().await?;
        with_timeout(
            "list_ids_without_tour_listing",
            self.config.read_timeout,
            self.store.list_ids_without_tour_listing(),
        )
        .await
    }

    /// Pass while the health flag is set; otherwise probe the store and
    /// either restore the flag or fail with `SVC_001`.
    async fn ensure_cache_healthy(&self) -> EncoreResult<()> {
        if self.health.is_healthy() {
            return Ok(());
        }

        match with_timeout("probe_health", self.config.read_timeout, self.store.probe_health()).await {
            Ok(()) => {
                if self.health.mark_healthy() {
                    tracing::info!("Cache health probe succeeded, cache marked healthy");
                    metrics::record(|m| m.set_cache_healthy(true));
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cache health probe failed");
                Err(ServiceError::unavailable(
                    ServiceCode::CacheUnhealthy,
                    format!("Cache is unhealthy: {}", e),
                )
                .into())
            }
        }
    }

    async fn read(&self, id: &str) -> EncoreResult<Option<ActRecord>> {
        let result = with_timeout("get", self.config.read_timeout, self.store.get(id)).await;
        let outcome = match &result {
            Ok(Some(_)) => "hit",
            Ok(None) => "miss",
            Err(_) => "error",
        };
        metrics::record(|m| m.record_lookup(outcome));
        result
    }

    /// Persist `record` in the background. Failure clears the health flag.
    fn write_detached(&self, record: ActRecord) {
        let store = Arc::clone(&self.store);
        let health = Arc::clone(&self.health);
        tokio::spawn(async move {
            if let Err(e) = store.upsert(&record).await {
                tracing::error!(act_id = %record.id, error = %e, "Cache write failed");
                metrics::record(|m| m.cache_write_failures_total.inc());
                if health.mark_unhealthy() {
                    tracing::warn!("Cache marked unhealthy after write failure");
                    metrics::record(|m| m.set_cache_healthy(false));
                }
            }
        });
    }
}

impl std::fmt::Debug for ActService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActService")
            .field("healthy", &self.health.is_healthy())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// INPUT VALIDATION
// ============================================================================

/// Validate a JSON id list: a non-empty array of non-blank strings.
pub fn parse_id_list(value: &Value) -> EncoreResult<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ValidationError::NotAnArray {
                found: json_type_name(other).to_string(),
            }
            .into())
        }
    };

    if items.is_empty() {
        return Err(ValidationError::EmptyIdList.into());
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item.as_str().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(ValidationError::InvalidId {
                reason: format!("entry {} must be a non-empty string", index),
            }
            .into()),
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::StorageError;
    use encore_test_utils::fixtures::{act_fixture, cached_act};
    use encore_test_utils::{MockEventGateway, MockMetadataGateway, ScriptedStore};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingScheduler {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl RefreshScheduler for RecordingScheduler {
        fn schedule_refresh(&self, ids: Vec<String>) {
            self.calls.lock().unwrap().push(ids);
        }
    }

    struct Harness {
        service: ActService,
        store: Arc<ScriptedStore>,
        metadata: Arc<MockMetadataGateway>,
        scheduler: Arc<RecordingScheduler>,
        health: Arc<CacheHealth>,
    }

    fn harness(store: ScriptedStore) -> Harness {
        let store = Arc::new(store);
        let metadata = Arc::new(MockMetadataGateway::new());
        let scheduler = Arc::new(RecordingScheduler::default());
        let health = Arc::new(CacheHealth::new());
        let service = ActService::new(
            store.clone(),
            Enricher::new(metadata.clone(), Arc::new(MockEventGateway::new())),
            scheduler.clone(),
            health.clone(),
            ActServiceConfig {
                read_timeout: Duration::from_millis(200),
            },
        );
        Harness {
            service,
            store,
            metadata,
            scheduler,
            health,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unhealthy_cache_with_failing_probe_is_unavailable() {
        let h = harness(ScriptedStore::with_records([act_fixture("a")]));
        h.health.mark_unhealthy();
        h.store.fail_probe(true);

        let err = h.service.get_one("a").await.unwrap_err();
        match err {
            EncoreError::Service(e) => assert_eq!(e.code(), ServiceCode::CacheUnhealthy),
            other => panic!("expected SVC_001, got {other:?}"),
        }
        assert_eq!(h.store.read_count(), 0);
        assert_eq!(h.metadata.call_count(), 0);
        assert!(!h.health.is_healthy());
    }

    #[tokio::test]
    async fn test_successful_probe_restores_health() {
        let h = harness(ScriptedStore::with_records([cached_act("a", Some(1))]));
        h.health.mark_unhealthy();

        let record = h.service.get_one("a").await.unwrap();
        assert_eq!(record.id, "a");
        assert_eq!(h.store.probe_count(), 1);
        assert!(h.health.is_healthy());

        h.service.get_one("a").await.unwrap();
        assert_eq!(h.store.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_hung_read_times_out() {
        let h = harness(ScriptedStore::new());
        h.store.set_read_delay(Some(Duration::from_secs(60)));

        let err = h.service.get_one("a").await.unwrap_err();
        assert!(matches!(err, EncoreError::Storage(StorageError::Timeout { .. })));
        assert_eq!(h.metadata.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_many_rejects_empty_input_without_touching_cache() {
        let h = harness(ScriptedStore::new());
        h.health.mark_unhealthy();

        let err = h.service.get_many(&[]).await.unwrap_err();
        assert_eq!(err, EncoreError::Validation(ValidationError::EmptyIdList));
        assert_eq!(h.store.probe_count(), 0);
        assert_eq!(h.store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_get_many_all_cached_keeps_input_order() {
        let h = harness(ScriptedStore::with_records([
            cached_act("a", Some(1)),
            cached_act("b", Some(2)),
        ]));

        let result = h.service.get_many(&ids(&["b", "a"])).await.unwrap();
        match result {
            BulkLookup::Complete { acts } => {
                assert_eq!(acts.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);
            }
            other => panic!("expected acts, got {other:?}"),
        }
        assert_eq!(h.metadata.call_count(), 0);
        assert!(h.scheduler.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_many_schedules_stale_hits() {
        let h = harness(ScriptedStore::with_records([
            cached_act("fresh", Some(1)),
            cached_act("old", Some(30)),
            cached_act("never", None),
        ]));

        let result = h.service.get_many(&ids(&["fresh", "old", "never"])).await.unwrap();
        assert!(matches!(result, BulkLookup::Complete { ref acts } if acts.len() == 3));
        assert_eq!(*h.scheduler.calls.lock().unwrap(), vec![ids(&["old", "never"])]);
    }

    #[tokio::test]
    async fn test_get_many_single_miss_is_fetched_in_place() {
        let h = harness(ScriptedStore::with_records([cached_act("a", Some(1))]));

        let result = h.service.get_many(&ids(&["new", "a"])).await.unwrap();
        match result {
            BulkLookup::Complete { acts } => {
                assert_eq!(acts[0].id, "new");
                assert!(acts[0].updated_at.is_some());
                assert_eq!(acts[1].id, "a");
            }
            other => panic!("expected acts, got {other:?}"),
        }
        assert_eq!(h.metadata.calls(), vec!["new"]);

        h.store.wait_for_writes(1).await;
        assert_eq!(h.store.written_ids(), vec!["new"]);
    }

    #[tokio::test]
    async fn test_get_many_read_error_is_svc_002() {
        let h = harness(ScriptedStore::with_records([cached_act("a", Some(1))]));
        h.store.fail_reads(true);

        let err = h.service.get_many(&ids(&["a", "b"])).await.unwrap_err();
        match err {
            EncoreError::Service(e) => assert_eq!(e.code(), ServiceCode::CacheReadFailed),
            other => panic!("expected SVC_002, got {other:?}"),
        }
        assert_eq!(h.metadata.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_many_unhealthy_cache_with_failing_probe_is_unavailable() {
        let h = harness(ScriptedStore::with_records([cached_act("a", Some(1))]));
        h.health.mark_unhealthy();
        h.store.fail_probe(true);

        let err = h.service.get_many(&ids(&["a", "b", "c"])).await.unwrap_err();
        match err {
            EncoreError::Service(e) => assert_eq!(e.code(), ServiceCode::CacheUnhealthy),
            other => panic!("expected SVC_001, got {other:?}"),
        }
        assert_eq!(h.store.probe_count(), 1);
        assert_eq!(h.store.read_count(), 0);
        assert_eq!(h.metadata.call_count(), 0);
        assert!(h.scheduler.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_many_single_miss_write_failure_keeps_response() {
        let h = harness(ScriptedStore::with_records([cached_act("a", Some(1))]));
        h.store.fail_writes(true);

        let result = h.service.get_many(&ids(&["a", "new"])).await.unwrap();
        match result {
            BulkLookup::Complete { acts } => {
                assert_eq!(acts.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["a", "new"]);
            }
            other => panic!("expected acts, got {other:?}"),
        }

        h.store.wait_for_writes(1).await;
        assert!(!h.health.is_healthy());
        assert!(h.store.written_ids().is_empty());
    }

    #[test]
    fn test_pending_fetch_wire_shape() {
        let body = serde_json::to_value(BulkLookup::Pending {
            error: PendingFetch::new(2, 1),
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "error": {
                    "message": "2 acts not cached. Background fetch initiated. Please try again in a few minutes.",
                    "missingCount": 2,
                    "cachedCount": 1
                }
            })
        );
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list(&json!(["a", " b "])).unwrap(), ids(&["a", "b"]));
        assert_eq!(
            parse_id_list(&json!("a")).unwrap_err(),
            EncoreError::Validation(ValidationError::NotAnArray {
                found: "string".to_string()
            })
        );
        assert_eq!(
            parse_id_list(&json!([])).unwrap_err(),
            EncoreError::Validation(ValidationError::EmptyIdList)
        );
        assert!(matches!(
            parse_id_list(&json!(["a", 3])).unwrap_err(),
            EncoreError::Validation(ValidationError::InvalidId { .. })
        ));
        assert!(parse_id_list(&json!(["a", ""])).is_err());
    }
}
