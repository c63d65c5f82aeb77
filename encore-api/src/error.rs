//! Error Types for Encore API
//!
//! This module defines error handling for the HTTP layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversion from the domain error taxonomy
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use encore_core::{EncoreError, ServiceError, StorageError, UpstreamError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested act does not exist upstream
    ActNotFound,

    // ========================================================================
    // Upstream Errors (502)
    // ========================================================================
    /// An upstream API failed or returned garbage
    UpstreamUnavailable,

    // ========================================================================
    // Server Errors (500, 503, 504)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Cache store operation failed
    StorageError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Operation timed out
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,

            ErrorCode::ActNotFound => StatusCode::NOT_FOUND,

            ErrorCode::UpstreamUnavailable => StatusCode::BAD_GATEWAY,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorCode::InternalError | ErrorCode::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::ActNotFound => "Act not found",
            ErrorCode::UpstreamUnavailable => "Upstream service failed",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Cache store operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::Timeout => "Operation timed out",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<EncoreError> for ApiError {
    fn from(err: EncoreError) -> Self {
        match err {
            EncoreError::Validation(e) => ApiError::validation_failed(e.to_string()),

            EncoreError::Service(ServiceError::Unavailable { code, reason }) => {
                ApiError::service_unavailable(reason)
                    .with_details(serde_json::json!({ "serviceCode": code.as_str() }))
            }

            EncoreError::Upstream(UpstreamError::NotFound { id, .. }) => {
                ApiError::new(ErrorCode::ActNotFound, format!("Act {} not found", id))
            }

            EncoreError::Upstream(UpstreamError::RateLimited {
                provider,
                retry_after_ms,
            }) => ApiError::new(
                ErrorCode::UpstreamUnavailable,
                format!("{} is rate limiting requests", provider),
            )
            .with_details(serde_json::json!({ "retryAfterMs": retry_after_ms })),

            EncoreError::Upstream(e) => {
                tracing::warn!(error = %e, "Upstream failure surfaced to client");
                ApiError::new(ErrorCode::UpstreamUnavailable, e.to_string())
            }

            EncoreError::Storage(StorageError::Timeout { operation, after }) => ApiError::new(
                ErrorCode::Timeout,
                format!("Cache {} timed out after {}ms", operation, after.as_millis()),
            ),

            EncoreError::Storage(e) => {
                // Full detail goes to the log, not the client.
                tracing::error!(error = %e, "Cache store error");
                ApiError::from_code(ErrorCode::StorageError)
            }

            EncoreError::Config(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
