/// Unified error types for vidhub
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds a client should wait before retrying an unavailable asset store
const RETRY_AFTER_SECS: u64 = 30;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum HubError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or invalid credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Actor is not the owner of the resource
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness conflicts (duplicate username, relation race)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The remote asset store rejected an upload
    #[error("Asset upload failed: {0}")]
    AssetUpload(String),

    /// The remote asset store did not acknowledge a removal
    #[error("Asset retirement failed: {0}")]
    AssetRetirement(String),

    /// The remote asset store timed out or could not be reached
    #[error("Asset store unavailable: {0}")]
    AssetStoreUnavailable(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HubError {
    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, HubError::AssetStoreUnavailable(_))
    }

    /// True when a sqlx error is a UNIQUE / PRIMARY KEY violation
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            HubError::Authentication(_) => (StatusCode::UNAUTHORIZED, "AuthenticationRequired"),
            HubError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            HubError::Validation(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            HubError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            HubError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            HubError::RateLimitExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "RateLimitExceeded"),
            HubError::AssetUpload(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AssetUploadFailed"),
            HubError::AssetRetirement(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AssetRetirementFailed")
            }
            HubError::AssetStoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "AssetStoreUnavailable")
            }
            HubError::Database(_) | HubError::Internal(_) | HubError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        }
    }
}

/// Error body, shares its shape with the success envelope in `api::response`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub success: bool,
    pub error: String,
    pub message: String,
}

/// Convert HubError to HTTP response
impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let retry_after = match &self {
            HubError::RateLimitExceeded { retry_after } => Some(retry_after.as_secs().max(1)),
            other if other.is_retryable() => Some(RETRY_AFTER_SECS),
            _ => None,
        };

        let message = match &self {
            HubError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal server error".to_string() // Don't leak details
            }
            HubError::Io(e) => {
                tracing::error!(error = %e, "IO error");
                "Internal server error".to_string()
            }
            HubError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "Internal server error".to_string()
            }
            HubError::RateLimitExceeded { .. } => "Rate limit exceeded".to_string(),
            other => other.to_string(),
        };

        crate::metrics::record_error(error_code);

        let body = Json(ErrorEnvelope {
            status_code: status.as_u16(),
            success: false,
            error: error_code.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type alias for vidhub operations
pub type HubResult<T> = Result<T, HubError>;
