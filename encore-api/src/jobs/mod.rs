//! Background jobs
//!
//! - [`FetchQueue`]: sequential, rate-limited refresh of ids handed over by
//!   the cache service
//! - [`CacheUpdater`]: startup bootstrap of stale acts, then a slow
//!   cyclical sweep of the whole cache

pub mod cache_updater;
pub mod fetch_queue;

pub use cache_updater::{CacheUpdater, CacheUpdaterConfig, CycleOutcome, UpdaterMetrics, UpdaterSnapshot};
pub use fetch_queue::{FetchQueue, FetchQueueConfig, FetchQueueMetrics, FetchQueueSnapshot};
