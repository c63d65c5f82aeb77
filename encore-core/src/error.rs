//! Error types for Encore operations

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Read failed for act {id}: {reason}")]
    ReadFailed { id: String, reason: String },

    #[error("Write failed for act {id}: {reason}")]
    WriteFailed { id: String, reason: String },

    #[error("Delete failed for act {id}: {reason}")]
    DeleteFailed { id: String, reason: String },

    #[error("Listing failed: {reason}")]
    ListFailed { reason: String },

    #[error("Corrupt record for act {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Failed to open store: {reason}")]
    Open { reason: String },

    #[error("Store operation {operation} did not settle within {after:?}")]
    Timeout { operation: String, after: Duration },
}

/// Upstream gateway errors (metadata API and tour-listing site).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("{provider} has no act with id {id}")]
    NotFound { provider: String, id: String },
}

/// Input validation errors. Raised before any cache or upstream access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one act id is required")]
    EmptyIdList,

    #[error("Act ids must be an array, got {found}")]
    NotAnArray { found: String },

    #[error("Invalid act id: {reason}")]
    InvalidId { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Stable codes attached to service-unavailable responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceCode {
    /// The cache health probe failed.
    CacheUnhealthy,
    /// A bulk cache read failed.
    CacheReadFailed,
}

impl ServiceCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheUnhealthy => "SVC_001",
            Self::CacheReadFailed => "SVC_002",
        }
    }
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retryable conditions surfaced to callers of the cache service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Service unavailable ({code}): {reason}")]
    Unavailable { code: ServiceCode, reason: String },
}

impl ServiceError {
    pub fn unavailable(code: ServiceCode, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            code,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ServiceCode {
        match self {
            Self::Unavailable { code, .. } => *code,
        }
    }
}

/// Master error type for all Encore errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Service(#[from] ServiceError),
}

/// Result type alias for Encore operations.
pub type EncoreResult<T> = Result<T, EncoreError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_codes_render_as_stable_strings() {
        assert_eq!(ServiceCode::CacheUnhealthy.to_string(), "SVC_001");
        assert_eq!(ServiceCode::CacheReadFailed.to_string(), "SVC_002");

        let err = EncoreError::from(ServiceError::unavailable(
            ServiceCode::CacheReadFailed,
            "connection reset",
        ));
        let msg = err.to_string();
        assert!(msg.contains("SVC_002"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_storage_timeout_display() {
        let err = StorageError::Timeout {
            operation: "get".to_string(),
            after: Duration::from_millis(250),
        };
        let msg = err.to_string();
        assert!(msg.contains("get"));
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_upstream_rate_limited_display() {
        let err = UpstreamError::RateLimited {
            provider: "musicbrainz".to_string(),
            retry_after_ms: 1500,
        };
        let msg = err.to_string();
        assert!(msg.contains("Rate limited"));
        assert!(msg.contains("musicbrainz"));
        assert!(msg.contains("1500"));
    }

    #[test]
    fn test_error_conversion() {
        let err: EncoreError = ValidationError::EmptyIdList.into();
        assert!(matches!(err, EncoreError::Validation(ValidationError::EmptyIdList)));
    }
}
