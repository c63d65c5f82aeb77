//! Cache health flag and health report types.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Soft circuit breaker in front of the cache store.
///
/// Starts healthy. Only an observed write failure marks it unhealthy, and
/// only a successful explicit probe marks it healthy again. One instance is
/// created by the composition root and shared by reference.
#[derive(Debug)]
pub struct CacheHealth {
    healthy: AtomicBool,
}

impl CacheHealth {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Record a failed write. Returns true if this call flipped the flag.
    pub fn mark_unhealthy(&self) -> bool {
        self.healthy.swap(false, Ordering::AcqRel)
    }

    /// Record a successful probe. Returns true if this call flipped the flag.
    pub fn mark_healthy(&self) -> bool {
        !self.healthy.swap(true, Ordering::AcqRel)
    }
}

impl Default for CacheHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Health status for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,
    /// Component is operational but degraded
    Degraded,
    /// Component is not operational
    Unhealthy,
}

/// Health check result for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl HealthCheck {
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            component: component.into(),
            message: None,
            response_time_ms: None,
        }
    }

    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            component: component.into(),
            message: Some(message.into()),
            response_time_ms: None,
        }
    }

    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            component: component.into(),
            message: Some(message.into()),
            response_time_ms: None,
        }
    }

    pub fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }
}
