//! Cache Updater
//!
//! Keeps cached acts fresh without client involvement, in two phases:
//!
//! 1. **Bootstrap**: one sequential pass at startup over every stale act,
//!    pausing between refreshes.
//! 2. **Cycle**: after a quiet period, sweep the whole cache once per cycle
//!    interval, spreading the refreshes evenly across it.
//!
//! Neither phase can be cancelled once started; both run for the lifetime
//! of the process. Individual failures are logged and skipped.

use encore_core::is_stale;
use encore_storage::{with_timeout, ActStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::env_secs;
use crate::constants::{
    DEFAULT_BACKGROUND_WRITE_TIMEOUT_SECS, DEFAULT_UPDATER_CYCLE_INTERVAL_SECS,
    DEFAULT_UPDATER_EMPTY_RETRY_SECS, DEFAULT_UPDATER_ITEM_DELAY_SECS,
    DEFAULT_UPDATER_QUIET_PERIOD_SECS, DEFAULT_UPDATER_RETRY_DELAY_SECS,
};
use crate::services::{Enricher, EventFailure};
use crate::telemetry::metrics;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheUpdaterConfig {
    /// Pause between two bootstrap refreshes (default: 30 seconds)
    pub item_delay: Duration,

    /// Pause between bootstrap and the first cycle (default: 12 hours)
    pub quiet_period: Duration,

    /// Duration of one full sweep of the cache (default: 24 hours)
    pub cycle_interval: Duration,

    /// Retry delay after the cache listing failed (default: 5 minutes)
    pub retry_delay: Duration,

    /// Retry delay while the cache is empty (default: 1 hour)
    pub empty_retry: Duration,

    /// Bound on one cache write; a hung write counts as failed (default: 30 seconds)
    pub write_timeout: Duration,
}

impl Default for CacheUpdaterConfig {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_secs(DEFAULT_UPDATER_ITEM_DELAY_SECS),
            quiet_period: Duration::from_secs(DEFAULT_UPDATER_QUIET_PERIOD_SECS),
            cycle_interval: Duration::from_secs(DEFAULT_UPDATER_CYCLE_INTERVAL_SECS),
            retry_delay: Duration::from_secs(DEFAULT_UPDATER_RETRY_DELAY_SECS),
            empty_retry: Duration::from_secs(DEFAULT_UPDATER_EMPTY_RETRY_SECS),
            write_timeout: Duration::from_secs(DEFAULT_BACKGROUND_WRITE_TIMEOUT_SECS),
        }
    }
}

impl CacheUpdaterConfig {
    /// Create CacheUpdaterConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ENCORE_UPDATER_ITEM_DELAY_SECS`: Bootstrap pause (default: 30)
    /// - `ENCORE_UPDATER_QUIET_PERIOD_SECS`: Pause before cycling (default: 43200)
    /// - `ENCORE_UPDATER_CYCLE_INTERVAL_SECS`: Full sweep duration (default: 86400)
    /// - `ENCORE_UPDATER_RETRY_DELAY_SECS`: Retry after listing error (default: 300)
    /// - `ENCORE_UPDATER_EMPTY_RETRY_SECS`: Retry while empty (default: 3600)
    /// - `ENCORE_BACKGROUND_WRITE_TIMEOUT_SECS`: Write bound (default: 30)
    pub fn from_env() -> Self {
        Self {
            item_delay: env_secs("ENCORE_UPDATER_ITEM_DELAY_SECS", DEFAULT_UPDATER_ITEM_DELAY_SECS),
            quiet_period: env_secs(
                "ENCORE_UPDATER_QUIET_PERIOD_SECS",
                DEFAULT_UPDATER_QUIET_PERIOD_SECS,
            ),
            cycle_interval: env_secs(
                "ENCORE_UPDATER_CYCLE_INTERVAL_SECS",
                DEFAULT_UPDATER_CYCLE_INTERVAL_SECS,
            ),
            retry_delay: env_secs(
                "ENCORE_UPDATER_RETRY_DELAY_SECS",
                DEFAULT_UPDATER_RETRY_DELAY_SECS,
            ),
            empty_retry: env_secs(
                "ENCORE_UPDATER_EMPTY_RETRY_SECS",
                DEFAULT_UPDATER_EMPTY_RETRY_SECS,
            ),
            write_timeout: env_secs(
                "ENCORE_BACKGROUND_WRITE_TIMEOUT_SECS",
                DEFAULT_BACKGROUND_WRITE_TIMEOUT_SECS,
            ),
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for updater activity since startup.
#[derive(Debug, Default)]
pub struct UpdaterMetrics {
    pub bootstrap_refreshed: AtomicU64,
    pub bootstrap_failed: AtomicU64,
    pub cycles_completed: AtomicU64,
    pub cycle_refreshed: AtomicU64,
    pub cycle_failed: AtomicU64,
    pub list_errors: AtomicU64,
}

impl UpdaterMetrics {
    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> UpdaterSnapshot {
        UpdaterSnapshot {
            bootstrap_refreshed: self.bootstrap_refreshed.load(Ordering::Relaxed),
            bootstrap_failed: self.bootstrap_failed.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycle_refreshed: self.cycle_refreshed.load(Ordering::Relaxed),
            cycle_failed: self.cycle_failed.load(Ordering::Relaxed),
            list_errors: self.list_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdaterSnapshot {
    pub bootstrap_refreshed: u64,
    pub bootstrap_failed: u64,
    pub cycles_completed: u64,
    pub cycle_refreshed: u64,
    pub cycle_failed: u64,
    pub list_errors: u64,
}

/// How one pass of the cycle phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Swept { refreshed: usize, failed: usize },
    Empty,
    ListFailed,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Bootstrap,
    Cycle,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Bootstrap => "bootstrap",
            Phase::Cycle => "cycle",
        }
    }
}

// ============================================================================
// UPDATER
// ============================================================================

pub struct CacheUpdater {
    store: Arc<dyn ActStore>,
    enricher: Enricher,
    config: CacheUpdaterConfig,
    metrics: UpdaterMetrics,
}

impl CacheUpdater {
    pub fn new(store: Arc<dyn ActStore>, enricher: Enricher, config: CacheUpdaterConfig) -> Self {
        Self {
            store,
            enricher,
            config,
            metrics: UpdaterMetrics::default(),
        }
    }

    pub fn metrics(&self) -> UpdaterSnapshot {
        self.metrics.snapshot()
    }

    /// Start both phases on a detached task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Bootstrap, wait out the quiet period, then cycle forever.
    pub async fn run(&self) {
        self.run_sequential_update().await;

        tracing::info!(
            quiet_period_secs = self.config.quiet_period.as_secs(),
            "Cache updater waiting before first refresh cycle"
        );
        tokio::time::sleep(self.config.quiet_period).await;

        loop {
            match self.run_refresh_cycle().await {
                CycleOutcome::Swept { .. } => {}
                CycleOutcome::Empty => tokio::time::sleep(self.config.empty_retry).await,
                CycleOutcome::ListFailed => tokio::time::sleep(self.config.retry_delay).await,
            }
        }
    }

    /// Refresh every stale cached act once, in id order.
    ///
    /// Returns how many acts were refreshed; a listing error returns 0.
    pub async fn run_sequential_update(&self) -> usize {
        let stamps = match self.store.list_stamps().await {
            Ok(stamps) => stamps,
            Err(e) => {
                tracing::error!(error = %e, "Bootstrap could not list cached acts");
                self.metrics.list_errors.fetch_add(1, Ordering::Relaxed);
                return 0;
            }
        };

        let total = stamps.len();
        let stale: Vec<String> = stamps
            .into_iter()
            .filter(|stamp| is_stale(stamp.updated_at.as_deref()))
            .map(|stamp| stamp.id)
            .collect();

        tracing::info!(total, stale = stale.len(), "Bootstrap pass started");

        let mut updated = 0;
        for (index, id) in stale.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.item_delay).await;
            }
            if self.refresh(Phase::Bootstrap, id).await {
                updated += 1;
            }
        }

        tracing::info!(
            updated,
            failed = stale.len() - updated,
            "Bootstrap pass completed"
        );
        updated
    }

    /// One sweep over every cached act, one refresh per time slice.
    pub async fn run_refresh_cycle(&self) -> CycleOutcome {
        let ids = match self.store.list_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_secs = self.config.retry_delay.as_secs(),
                    "Refresh cycle could not list cached acts"
                );
                self.metrics.list_errors.fetch_add(1, Ordering::Relaxed);
                return CycleOutcome::ListFailed;
            }
        };

        if ids.is_empty() {
            tracing::info!(
                retry_secs = self.config.empty_retry.as_secs(),
                "Cache is empty, nothing to refresh"
            );
            return CycleOutcome::Empty;
        }

        let slice = self.slice_for(ids.len());
        tracing::info!(acts = ids.len(), slice_secs = slice.as_secs(), "Refresh cycle started");

        let mut refreshed = 0;
        let mut failed = 0;
        for id in &ids {
            if self.refresh(Phase::Cycle, id).await {
                refreshed += 1;
            } else {
                failed += 1;
            }
            tokio::time::sleep(slice).await;
        }

        self.metrics.cycles_completed.fetch_add(1, Ordering::Relaxed);
        tracing::info!(refreshed, failed, "Refresh cycle completed");
        CycleOutcome::Swept { refreshed, failed }
    }

    /// Share of the cycle interval given to each of `count` acts.
    fn slice_for(&self, count: usize) -> Duration {
        let count = u32::try_from(count.max(1)).unwrap_or(u32::MAX);
        self.config.cycle_interval / count
    }

    /// Enrich and write one act. Returns whether both steps succeeded.
    async fn refresh(&self, phase: Phase, id: &str) -> bool {
        let (refreshed, failed) = match phase {
            Phase::Bootstrap => (&self.metrics.bootstrap_refreshed, &self.metrics.bootstrap_failed),
            Phase::Cycle => (&self.metrics.cycle_refreshed, &self.metrics.cycle_failed),
        };

        let result = match self.enricher.enrich(id, EventFailure::Silent).await {
            Ok(record) => {
                with_timeout("upsert", self.config.write_timeout, self.store.upsert(&record)).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                refreshed.fetch_add(1, Ordering::Relaxed);
                metrics::record(|m| m.record_refresh(phase.as_str(), true));
                true
            }
            Err(e) => {
                tracing::warn!(
                    act_id = %id,
                    phase = phase.as_str(),
                    error = %e,
                    "Act refresh failed, skipping"
                );
                failed.fetch_add(1, Ordering::Relaxed);
                metrics::record(|m| m.record_refresh(phase.as_str(), false));
                false
            }
        }
    }
}

impl std::fmt::Debug for CacheUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheUpdater")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::UpstreamError;
    use encore_test_utils::fixtures::cached_act;
    use encore_test_utils::{MockEventGateway, MockMetadataGateway, ScriptedStore};
    use tokio::time::Instant;

    fn updater(
        store: Arc<ScriptedStore>,
        metadata: Arc<MockMetadataGateway>,
    ) -> CacheUpdater {
        CacheUpdater::new(
            store,
            Enricher::new(metadata, Arc::new(MockEventGateway::new())),
            CacheUpdaterConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_refreshes_only_stale_acts() {
        let store = Arc::new(ScriptedStore::with_records([
            cached_act("fresh", Some(12)),
            cached_act("old", Some(25)),
            cached_act("never", None),
        ]));
        let metadata = Arc::new(MockMetadataGateway::new());
        let updater = updater(store.clone(), metadata.clone());

        assert_eq!(updater.run_sequential_update().await, 2);
        assert_eq!(metadata.calls(), vec!["never", "old"]);
        assert_eq!(store.written_ids(), vec!["never", "old"]);
        assert_eq!(updater.metrics().bootstrap_refreshed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_pauses_between_acts() {
        let store = Arc::new(ScriptedStore::with_records([
            cached_act("a", None),
            cached_act("b", None),
            cached_act("c", None),
        ]));
        let updater = updater(store, Arc::new(MockMetadataGateway::new()));

        let start = Instant::now();
        updater.run_sequential_update().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_skips_failures() {
        let store = Arc::new(ScriptedStore::with_records([
            cached_act("a", None),
            cached_act("b", None),
        ]));
        let metadata = Arc::new(MockMetadataGateway::new().with_failure(
            "a",
            UpstreamError::InvalidResponse {
                provider: "musicbrainz".to_string(),
                reason: "truncated".to_string(),
            }
            .into(),
        ));
        let updater = updater(store.clone(), metadata);

        assert_eq!(updater.run_sequential_update().await, 1);
        assert_eq!(store.written_ids(), vec!["b"]);
        assert_eq!(updater.metrics().bootstrap_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_hung_write_is_skipped() {
        let store = Arc::new(ScriptedStore::with_records([
            cached_act("a", None),
            cached_act("b", None),
        ]));
        store.set_write_delay(Some(Duration::from_secs(24 * 3600)));
        let metadata = Arc::new(MockMetadataGateway::new());
        let updater = updater(store.clone(), metadata.clone());

        let start = Instant::now();
        assert_eq!(updater.run_sequential_update().await, 0);
        assert!(start.elapsed() < Duration::from_secs(120));
        assert_eq!(metadata.calls(), vec!["a", "b"]);
        assert_eq!(updater.metrics().bootstrap_failed, 2);
    }

    #[tokio::test]
    async fn test_bootstrap_listing_error_reports_zero() {
        let store = Arc::new(ScriptedStore::with_records([cached_act("a", None)]));
        store.fail_list(true);
        let metadata = Arc::new(MockMetadataGateway::new());
        let updater = updater(store, metadata.clone());

        assert_eq!(updater.run_sequential_update().await, 0);
        assert_eq!(metadata.call_count(), 0);
        assert_eq!(updater.metrics().list_errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_spreads_refreshes_over_interval() {
        let store = Arc::new(ScriptedStore::with_records([
            cached_act("a", Some(1)),
            cached_act("b", Some(1)),
            cached_act("c", Some(1)),
            cached_act("d", Some(1)),
        ]));
        let updater = updater(store.clone(), Arc::new(MockMetadataGateway::new()));

        let start = Instant::now();
        let outcome = updater.run_refresh_cycle().await;

        assert_eq!(outcome, CycleOutcome::Swept { refreshed: 4, failed: 0 });
        assert_eq!(store.written_ids(), vec!["a", "b", "c", "d"]);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(86_400));
        assert!(elapsed < Duration::from_secs(86_400 + 60));
    }

    #[tokio::test]
    async fn test_cycle_empty_and_list_failure() {
        let store = Arc::new(ScriptedStore::new());
        let updater = updater(store.clone(), Arc::new(MockMetadataGateway::new()));
        assert_eq!(updater.run_refresh_cycle().await, CycleOutcome::Empty);

        store.fail_list(true);
        assert_eq!(updater.run_refresh_cycle().await, CycleOutcome::ListFailed);
    }

    #[test]
    fn test_slice_for() {
        let updater = updater(
            Arc::new(ScriptedStore::new()),
            Arc::new(MockMetadataGateway::new()),
        );
        assert_eq!(updater.slice_for(4), Duration::from_secs(6 * 3600));
        assert_eq!(updater.slice_for(0), Duration::from_secs(86_400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_bootstraps_then_cycles_after_quiet_period() {
        let store = Arc::new(ScriptedStore::with_records([cached_act("a", None)]));
        let updater = Arc::new(updater(store.clone(), Arc::new(MockMetadataGateway::new())));
        let handle = Arc::clone(&updater).spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.written_ids(), vec!["a"]);

        tokio::time::sleep(Duration::from_secs(6 * 3600)).await;
        assert_eq!(store.written_ids().len(), 1);

        tokio::time::sleep(Duration::from_secs(6 * 3600 + 60)).await;
        assert_eq!(store.written_ids(), vec!["a", "a"]);

        handle.abort();
    }
}
