//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/ready - Cache store probe, health flag and fetch queue state
//!
//! The readiness probe never changes the cache health flag; only the
//! read path does that.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use encore_core::{HealthCheck, HealthStatus};
use encore_storage::with_timeout;
use serde::Serialize;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: Vec<HealthCheck>,
}

/// Overall status: the worst of the component statuses.
pub fn overall_status(checks: &[HealthCheck]) -> HealthStatus {
    if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/ready - Readiness check
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let start = std::time::Instant::now();
    let store = match with_timeout("probe_health", state.probe_timeout, state.store.probe_health()).await {
        Ok(()) => HealthCheck::healthy("cache_store")
            .with_response_time(start.elapsed().as_millis() as u64),
        Err(e) => HealthCheck::unhealthy("cache_store", e.to_string()),
    };

    let flag = if state.health.is_healthy() {
        HealthCheck::healthy("cache_health_flag")
    } else {
        HealthCheck::degraded(
            "cache_health_flag",
            "A cache write failed; reads probe the store until it recovers",
        )
    };

    let pending = state.queue.pending_len();
    let queue = if state.queue.is_running() {
        HealthCheck::degraded("fetch_queue", format!("{} acts pending", pending))
    } else {
        HealthCheck::healthy("fetch_queue")
    };

    let checks = vec![store, flag, queue];
    let status = overall_status(&checks);
    let response = ReadinessResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        checks,
    };

    let status_code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status_takes_worst() {
        let healthy = HealthCheck::healthy("a");
        let degraded = HealthCheck::degraded("b", "slow");
        let unhealthy = HealthCheck::unhealthy("c", "down");

        assert_eq!(overall_status(&[healthy.clone()]), HealthStatus::Healthy);
        assert_eq!(
            overall_status(&[healthy.clone(), degraded.clone()]),
            HealthStatus::Degraded
        );
        assert_eq!(
            overall_status(&[healthy, degraded, unhealthy]),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_readiness_response_serialization() {
        let response = ReadinessResponse {
            status: HealthStatus::Healthy,
            version: "0.3.0".to_string(),
            uptime_seconds: 5,
            checks: vec![HealthCheck::healthy("cache_store").with_response_time(2)],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["checks"][0]["component"], "cache_store");
        assert_eq!(json["checks"][0]["response_time_ms"], 2);
        assert!(json["checks"][0].get("message").is_none());
    }
}
