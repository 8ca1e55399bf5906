//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use entrada_core::EntradaError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Entrada core error - ledger, storage or collaborator failure
    #[error("Entrada error: {0}")]
    Entrada(#[from] EntradaError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Entrada(ref e) => match e {
                // Missing records, staged files or stored objects → 404
                EntradaError::NotFound(_) => StatusCode::NOT_FOUND,

                // Collaborator failures → 503
                EntradaError::Recognition(_)
                | EntradaError::Storage(_)
                | EntradaError::Http(_) => StatusCode::SERVICE_UNAVAILABLE,

                // Ledger and local failures → 500
                EntradaError::LedgerCorrupt(_)
                | EntradaError::Serialization(_)
                | EntradaError::EnrollmentIncomplete(_)
                | EntradaError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Entrada(ref e) => match e {
                EntradaError::NotFound(_) => "NOT_FOUND",
                EntradaError::Recognition(_) => "RECOGNITION_UNAVAILABLE",
                EntradaError::Storage(_) => "STORAGE_ERROR",
                EntradaError::Http(_) => "UPSTREAM_ERROR",
                EntradaError::LedgerCorrupt(_) => "LEDGER_CORRUPT",
                EntradaError::Serialization(_) => "SERIALIZATION_ERROR",
                EntradaError::EnrollmentIncomplete(_) => "ENROLLMENT_INCOMPLETE",
                EntradaError::Io(_) => "IO_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // For core errors, sanitize internal details
            Self::Entrada(ref e) => match e {
                EntradaError::NotFound(message) => message.clone(),
                EntradaError::Recognition(_) => "Unexpected error during recognition.".to_string(),
                EntradaError::Storage(_) => "Storage backend error.".to_string(),
                EntradaError::Http(_) => "Upstream service error.".to_string(),
                EntradaError::LedgerCorrupt(_) => "Visit ledger is corrupt.".to_string(),
                EntradaError::Serialization(_) => "Ledger serialization error.".to_string(),
                EntradaError::EnrollmentIncomplete(_) => {
                    "Enrollment did not return an identity.".to_string()
                }
                EntradaError::Io(_) => "Local i/o error.".to_string(),
            },
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::Entrada(_) => "entrada",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::NotFound(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Server error"
                );
            }
            // For core errors, log full internal details
            Self::Entrada(_) => {
                if status.is_server_error() {
                    tracing::error!(
                        status = %status,
                        category = category,
                        code = code,
                        error = %internal_message,
                        client_message = %client_message,
                        "Entrada error (internal details logged)"
                    );
                } else {
                    tracing::warn!(
                        status = %status,
                        category = category,
                        code = code,
                        error = %internal_message,
                        "Entrada error"
                    );
                }
            }
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "success": false,
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::from(EntradaError::NotFound("no image".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn collaborator_failure_maps_to_503() {
        let err = ApiError::from(EntradaError::Recognition("backend down".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn ledger_corrupt_maps_to_500() {
        let err = ApiError::from(EntradaError::LedgerCorrupt("bad json".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "LEDGER_CORRUPT");
    }
}
