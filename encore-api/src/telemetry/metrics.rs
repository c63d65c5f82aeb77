//! Prometheus Metrics Definitions
//!
//! Defines all Encore metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Encoder, Gauge,
    TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<EncoreMetrics>> = Lazy::new(EncoreMetrics::new);

/// Run `f` against the global metrics, if they registered.
pub fn record<F: FnOnce(&EncoreMetrics)>(f: F) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// Container for all Encore metrics.
#[derive(Clone)]
pub struct EncoreMetrics {
    /// Cache lookups - labels: result (hit/miss/error)
    pub cache_lookups_total: CounterVec,

    /// Detached cache writes that failed
    pub cache_write_failures_total: Counter,

    /// 1 while the cache health flag is set, 0 otherwise
    pub cache_healthy: Gauge,

    /// Background refreshes - labels: source (queue/bootstrap/cycle), status
    pub background_refreshes_total: CounterVec,

    /// Ids waiting in the fetch queue
    pub fetch_queue_depth: Gauge,

    /// Fetch queue workers spawned
    pub fetch_queue_workers_started_total: Counter,
}

impl EncoreMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        let metrics = Self {
            cache_lookups_total: register_counter_vec!(
                "encore_cache_lookups_total",
                "Total number of cache lookups by result",
                &["result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_lookups_total: {}", e)))?,

            cache_write_failures_total: register_counter!(
                "encore_cache_write_failures_total",
                "Total number of failed detached cache writes"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_write_failures_total: {}", e)))?,

            cache_healthy: register_gauge!(
                "encore_cache_healthy",
                "Whether the cache health flag is set (1) or cleared (0)"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_healthy: {}", e)))?,

            background_refreshes_total: register_counter_vec!(
                "encore_background_refreshes_total",
                "Total number of background act refreshes",
                &["source", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register background_refreshes_total: {}", e)))?,

            fetch_queue_depth: register_gauge!(
                "encore_fetch_queue_depth",
                "Current number of act ids waiting in the fetch queue"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register fetch_queue_depth: {}", e)))?,

            fetch_queue_workers_started_total: register_counter!(
                "encore_fetch_queue_workers_started_total",
                "Total number of fetch queue workers started"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register fetch_queue_workers_started_total: {}", e)))?,
        };

        // The flag starts set.
        metrics.cache_healthy.set(1.0);
        Ok(metrics)
    }

    /// Record a cache lookup outcome.
    pub fn record_lookup(&self, result: &str) {
        self.cache_lookups_total.with_label_values(&[result]).inc();
    }

    /// Record a background refresh.
    pub fn record_refresh(&self, source: &str, success: bool) {
        let status = if success { "success" } else { "failure" };
        self.background_refreshes_total
            .with_label_values(&[source, status])
            .inc();
    }

    pub fn set_cache_healthy(&self, healthy: bool) {
        self.cache_healthy.set(if healthy { 1.0 } else { 0.0 });
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.fetch_queue_depth.set(depth as f64);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    // Make sure the Encore families exist even before first use.
    Lazy::force(&METRICS);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
