//! Error Types for the Atrium Edge
//!
//! - `ApiError` struct for structured error responses
//! - `ErrorCode` enum for categorizing errors
//! - `IntoResponse` implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use atrium_core::{AtriumError, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Required field is missing from request
    MissingField,

    /// Field format is incorrect
    InvalidFormat,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// No tenant claims the requested host or slug
    TenantNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Another tenant already claims the domain or slug
    TenantConflict,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    InternalError,

    /// Migration registry is inconsistent
    RegistryError,

    DatabaseError,

    /// Tenant store is unreachable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MissingField | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            ErrorCode::TenantNotFound => StatusCode::NOT_FOUND,

            ErrorCode::TenantConflict => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError | ErrorCode::RegistryError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
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

/// Structured error response returned by every edge endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
        .with_details(serde_json::json!({ "field": field }))
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
        .with_details(serde_json::json!({ "field": field, "expected": expected }))
    }

    /// No tenant for a host or slug.
    pub fn tenant_not_found(key: impl fmt::Display) -> Self {
        Self::new(ErrorCode::TenantNotFound, format!("No tenant for {}", key))
    }

    pub fn tenant_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TenantConflict, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn registry_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RegistryError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<AtriumError> for ApiError {
    fn from(err: AtriumError) -> Self {
        match err {
            AtriumError::Store(err) => match err {
                StoreError::Unavailable { .. } => ApiError::service_unavailable(err.to_string()),
                StoreError::DomainConflict { .. } | StoreError::SlugConflict { .. } => {
                    ApiError::tenant_conflict(err.to_string())
                }
                StoreError::QueryFailed { .. } | StoreError::LockPoisoned => {
                    tracing::error!(error = %err, "Tenant store error");
                    ApiError::database_error(err.to_string())
                }
            },
            AtriumError::Version(err) => {
                ApiError::invalid_format("version", &format!("semantic version ({})", err))
            }
            AtriumError::Migration(err) => ApiError::registry_error(err.to_string()),
            AtriumError::Config(err) => ApiError::internal_error(err.to_string()),
        }
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
