//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use encore_core::CacheHealth;
use encore_storage::ActStore;

use crate::jobs::FetchQueue;
use crate::services::ActService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ActService>,
    /// Used directly only by the readiness probe.
    pub store: Arc<dyn ActStore>,
    pub queue: FetchQueue,
    pub health: Arc<CacheHealth>,
    /// Bound on the readiness store probe.
    pub probe_timeout: Duration,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        service: Arc<ActService>,
        store: Arc<dyn ActStore>,
        queue: FetchQueue,
        probe_timeout: Duration,
    ) -> Self {
        let health = Arc::clone(service.health());
        Self {
            service,
            store,
            queue,
            health,
            probe_timeout,
            start_time: Instant::now(),
        }
    }
}
