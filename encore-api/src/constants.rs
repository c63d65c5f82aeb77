//! Constants for Encore API
//!
//! Default values for every tunable. Environment overrides are read by the
//! `from_env` constructors next to the code that uses them.

// ============================================================================
// HTTP SERVER
// ============================================================================

/// Default bind address
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

// ============================================================================
// CACHE STORE
// ============================================================================

/// Default LMDB directory
pub const DEFAULT_STORE_PATH: &str = "./data/acts";

/// Default LMDB map size in megabytes
pub const DEFAULT_STORE_MAX_SIZE_MB: usize = 1024;

/// Default bound on cache reads and health probes (milliseconds)
pub const DEFAULT_CACHE_READ_TIMEOUT_MS: u64 = 5000;

/// Default bound on one cache write made by a background job (seconds)
pub const DEFAULT_BACKGROUND_WRITE_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// FETCH QUEUE
// ============================================================================

/// Default pause between two queued refreshes (seconds)
pub const DEFAULT_FETCH_QUEUE_DELAY_SECS: u64 = 30;

// ============================================================================
// CACHE UPDATER
// ============================================================================

/// Default pause between two bootstrap refreshes (seconds)
pub const DEFAULT_UPDATER_ITEM_DELAY_SECS: u64 = 30;

/// Default pause between bootstrap and the first cycle (12 hours)
pub const DEFAULT_UPDATER_QUIET_PERIOD_SECS: u64 = 43_200;

/// Default time for one full sweep of the cache (24 hours)
pub const DEFAULT_UPDATER_CYCLE_INTERVAL_SECS: u64 = 86_400;

/// Default retry delay after a listing error (5 minutes)
pub const DEFAULT_UPDATER_RETRY_DELAY_SECS: u64 = 300;

/// Default retry delay while the cache is empty (1 hour)
pub const DEFAULT_UPDATER_EMPTY_RETRY_SECS: u64 = 3_600;

// ============================================================================
// LOGGING
// ============================================================================

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "encore_api=info,tower_http=info";
