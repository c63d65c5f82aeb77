//! REST API Routes Module
//!
//! - `/acts`: single and bulk act reads
//! - `/health`: liveness and readiness
//! - `/maintenance`: cache inspection
//! - `/metrics`: Prometheus scrape endpoint

pub mod acts;
pub mod health;
pub mod maintenance;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::telemetry::metrics_handler;

pub use acts::create_router as acts_router;
pub use health::create_router as health_router;
pub use maintenance::create_router as maintenance_router;

/// Assemble the full API router.
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .nest("/acts", acts_router())
        .nest("/health", health_router())
        .nest("/maintenance", maintenance_router())
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
