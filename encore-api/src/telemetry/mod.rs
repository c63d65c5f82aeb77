//! Encore Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics for the cache
//! service and its background jobs.

pub mod metrics;
pub mod tracer;

pub use metrics::{metrics_handler, EncoreMetrics, METRICS};
pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
