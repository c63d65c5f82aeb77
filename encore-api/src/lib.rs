//! Encore API - Act Cache Service
//!
//! Serves music act records (MusicBrainz metadata enriched with Bandsintown
//! tour events) through a read-through cache, and keeps that cache fresh in
//! the background:
//!
//! - [`services::ActService`]: cache-first reads guarded by a soft circuit
//!   breaker ([`encore_core::CacheHealth`])
//! - [`jobs::FetchQueue`]: single-worker, rate-limited refresh of ids the
//!   read path could not serve
//! - [`jobs::CacheUpdater`]: bootstrap pass over stale acts, then a
//!   cyclical sweep of the whole cache
//! - [`routes`]: thin axum layer on top

pub mod config;
pub mod constants;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use jobs::{CacheUpdater, CacheUpdaterConfig, FetchQueue, FetchQueueConfig};
pub use routes::create_api_router;
pub use services::{ActService, ActServiceConfig, BulkLookup, Enricher, EventFailure, PendingFetch};
pub use state::AppState;
