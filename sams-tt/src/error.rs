//! HTTP error type for sams-tt
//!
//! Every handler failure is rendered as `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generator::GeneratorError;
use crate::voting::VotingError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g. finalize with no votes
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller lacks the role or enrollment (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or unknown caller identity (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Schedule generator failed (502)
    #[error("Schedule generator error: {0}")]
    Generator(String),

    /// No schedule generator configured (503)
    #[error("Schedule generator unavailable: {0}")]
    GeneratorUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<VotingError> for ApiError {
    fn from(err: VotingError) -> Self {
        match err {
            VotingError::Validation(msg) => ApiError::BadRequest(msg),
            VotingError::NotFound(msg) => ApiError::NotFound(msg),
            VotingError::Conflict(msg) => ApiError::Conflict(msg),
            VotingError::Forbidden(msg) => ApiError::Forbidden(msg),
            VotingError::Generator(GeneratorError::NotConfigured(msg)) => {
                ApiError::GeneratorUnavailable(msg)
            }
            VotingError::Generator(err) => ApiError::Generator(err.to_string()),
            VotingError::Store(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<sams_common::Error> for ApiError {
    fn from(err: sams_common::Error) -> Self {
        VotingError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Generator(_) => (StatusCode::BAD_GATEWAY, "GENERATOR_ERROR"),
            ApiError::GeneratorUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "GENERATOR_UNAVAILABLE")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
