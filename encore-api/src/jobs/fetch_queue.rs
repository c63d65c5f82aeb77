//! Fetch Queue
//!
//! FIFO of act ids drained by at most one worker task. The worker
//! re-enriches and re-caches one id at a time and pauses between items so
//! upstream sees a steady trickle instead of a burst.
//!
//! # Configuration
//!
//! ```rust
//! use encore_api::jobs::FetchQueueConfig;
//! use std::time::Duration;
//!
//! let config = FetchQueueConfig {
//!     item_delay: Duration::from_secs(30), // pause between two ids
//!     write_timeout: Duration::from_secs(30),
//! };
//! ```

use encore_storage::{with_timeout, ActStore};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::env_secs;
use crate::constants::{DEFAULT_BACKGROUND_WRITE_TIMEOUT_SECS, DEFAULT_FETCH_QUEUE_DELAY_SECS};
use crate::services::{Enricher, EventFailure, RefreshScheduler};
use crate::telemetry::metrics;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct FetchQueueConfig {
    /// Pause after each id while more are pending (default: 30 seconds)
    pub item_delay: Duration,

    /// Bound on one cache write; a hung write counts as failed (default: 30 seconds)
    pub write_timeout: Duration,
}

impl Default for FetchQueueConfig {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_secs(DEFAULT_FETCH_QUEUE_DELAY_SECS),
            write_timeout: Duration::from_secs(DEFAULT_BACKGROUND_WRITE_TIMEOUT_SECS),
        }
    }
}

impl FetchQueueConfig {
    /// Create FetchQueueConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ENCORE_FETCH_QUEUE_DELAY_SECS`: Pause between ids (default: 30)
    /// - `ENCORE_BACKGROUND_WRITE_TIMEOUT_SECS`: Write bound (default: 30)
    pub fn from_env() -> Self {
        Self {
            item_delay: env_secs("ENCORE_FETCH_QUEUE_DELAY_SECS", DEFAULT_FETCH_QUEUE_DELAY_SECS),
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

/// Counters for fetch queue activity since startup.
#[derive(Debug, Default)]
pub struct FetchQueueMetrics {
    /// Ids handed to `enqueue`
    pub enqueued: AtomicU64,

    /// Ids enriched and written back
    pub refreshed: AtomicU64,

    /// Ids whose enrichment or write failed
    pub failed: AtomicU64,

    /// Worker tasks spawned
    pub workers_started: AtomicU64,
}

impl FetchQueueMetrics {
    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> FetchQueueSnapshot {
        FetchQueueSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            refreshed: self.refreshed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            workers_started: self.workers_started.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchQueueSnapshot {
    pub enqueued: u64,
    pub refreshed: u64,
    pub failed: u64,
    pub workers_started: u64,
}

// ============================================================================
// QUEUE
// ============================================================================

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<String>,
    running: bool,
}

struct Shared {
    store: Arc<dyn ActStore>,
    enricher: Enricher,
    config: FetchQueueConfig,
    /// Never held across an await.
    state: Mutex<QueueState>,
    /// `true` while no worker is running.
    idle: watch::Sender<bool>,
    metrics: FetchQueueMetrics,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background refresh queue with a single worker.
///
/// Duplicated ids are not collapsed; each occurrence is refreshed.
#[derive(Clone)]
pub struct FetchQueue {
    shared: Arc<Shared>,
}

impl FetchQueue {
    pub fn new(store: Arc<dyn ActStore>, enricher: Enricher, config: FetchQueueConfig) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared {
                store,
                enricher,
                config,
                state: Mutex::new(QueueState::default()),
                idle,
                metrics: FetchQueueMetrics::default(),
            }),
        }
    }

    /// Append `ids` and start a worker unless one is already draining.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        let count = ids.len() as u64;

        let (start_worker, depth) = {
            let mut state = self.shared.lock();
            state.pending.extend(ids);
            let start_worker = !state.running;
            if start_worker {
                state.running = true;
                self.shared.idle.send_replace(false);
            }
            (start_worker, state.pending.len())
        };

        self.shared.metrics.enqueued.fetch_add(count, Ordering::Relaxed);
        metrics::record(|m| m.set_queue_depth(depth));

        if start_worker {
            self.shared
                .metrics
                .workers_started
                .fetch_add(1, Ordering::Relaxed);
            metrics::record(|m| m.fetch_queue_workers_started_total.inc());
            tokio::spawn(run_worker(Arc::clone(&self.shared)));
        }
    }

    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Resolve once no worker is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.idle.subscribe();
        let _ = rx.wait_for(|idle| *idle).await;
    }

    pub fn metrics(&self) -> FetchQueueSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl RefreshScheduler for FetchQueue {
    fn schedule_refresh(&self, ids: Vec<String>) {
        self.enqueue(ids);
    }
}

impl std::fmt::Debug for FetchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("FetchQueue")
            .field("pending", &state.pending.len())
            .field("running", &state.running)
            .field("config", &self.shared.config)
            .finish()
    }
}

// ============================================================================
// WORKER
// ============================================================================

/// Drain the queue. The emptiness check that ends the loop and the reset of
/// `running` happen under one lock, so an `enqueue` racing with shutdown
/// either lands before it (and is processed here) or after it (and starts a
/// new worker).
async fn run_worker(shared: Arc<Shared>) {
    tracing::info!("Fetch queue worker started");
    let mut processed = 0u64;

    loop {
        let next = {
            let mut state = shared.lock();
            let next = state.pending.pop_front();
            if next.is_none() {
                state.running = false;
                shared.idle.send_replace(true);
            }
            next
        };
        let Some(id) = next else { break };

        refresh_one(&shared, &id).await;
        processed += 1;

        let remaining = {
            let mut state = shared.lock();
            let remaining = state.pending.len();
            if remaining == 0 {
                state.running = false;
                shared.idle.send_replace(true);
            }
            remaining
        };
        metrics::record(|m| m.set_queue_depth(remaining));

        if remaining == 0 {
            break;
        }
        tokio::time::sleep(shared.config.item_delay).await;
    }

    tracing::info!(processed, "Fetch queue drained, worker stopped");
}

async fn refresh_one(shared: &Shared, id: &str) {
    let record = match shared.enricher.enrich(id, EventFailure::Silent).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(act_id = %id, error = %e, "Background fetch failed, skipping act");
            shared.metrics.failed.fetch_add(1, Ordering::Relaxed);
            metrics::record(|m| m.record_refresh("queue", false));
            return;
        }
    };

    match with_timeout("upsert", shared.config.write_timeout, shared.store.upsert(&record)).await {
        Ok(()) => {
            tracing::debug!(act_id = %id, status = %record.status, "Background fetch cached act");
            shared.metrics.refreshed.fetch_add(1, Ordering::Relaxed);
            metrics::record(|m| m.record_refresh("queue", true));
        }
        Err(e) => {
            tracing::error!(act_id = %id, error = %e, "Background fetch could not write act");
            shared.metrics.failed.fetch_add(1, Ordering::Relaxed);
            metrics::record(|m| m.record_refresh("queue", false));
        }
    }
}
