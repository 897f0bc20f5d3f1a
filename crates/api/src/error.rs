//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::SagaError;

/// The closed set of failures the transport surface distinguishes.
///
/// Every saga/store failure is folded into one of these kinds and mapped
/// to its own status code; there is no catch-all response.
#[derive(Debug)]
pub enum ApiError {
    /// The request itself is invalid (bad piece count, malformed id).
    Validation(String),
    /// Resource not found.
    NotFound(String),
    /// The caller is not allowed to perform the operation.
    Unauthorized(String),
    /// The request conflicts with the resource's current state.
    Conflict(String),
    /// A collaborator (store, broker) is unavailable.
    Upstream(String),
    /// Anything that should never happen.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Upstream(msg) => {
                tracing::error!(error = %msg, "upstream collaborator unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        match &err {
            SagaError::InvalidPieceCount { .. } => ApiError::Validation(err.to_string()),
            SagaError::Store(_) | SagaError::Broker(_) => ApiError::Upstream(err.to_string()),
            SagaError::Serialization(_) => ApiError::Internal(err.to_string()),
        }
    }
}
