//! API error responses.
//!
//! Every error leaves this layer as a JSON body with a `success: false`
//! flag and an `error` message, with the HTTP status carrying the class:
//! 400 for bad query parameters, 503 for a failed health probe, 500 for
//! store failures. The API performs no retries; a 500 is safe for the
//! client to retry.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use entroscan_indexer::error::IndexerError;

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed (unknown type, bad parameter).
    #[error("{0}")]
    BadRequest(String),

    /// The store round-trip behind `/health` failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store failed while serving a query.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IndexerError> for ApiError {
    fn from(err: IndexerError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Body shape for error responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn indexer_errors_become_internal() {
        let err = ApiError::from(IndexerError::Store("connection dropped".into()));
        assert!(matches!(err, ApiError::Internal(_)));
        assert!(err.to_string().contains("connection dropped"));
    }
}
