//! Error types for te-server
//!
//! Every failure a handler can report maps to an HTTP status and a short
//! machine-readable code; the body is always `{"error": "<code>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt::Display;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed validation (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or mismatched participant cookie (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Participant or results do not exist (404)
    #[error("Not found: {0}")]
    NotFound(&'static str),

    /// Storage failure (500); the cause is logged, only the code is returned
    #[error("Internal error: {0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>) -> Self {
        ApiError::BadRequest(code.into())
    }

    /// Log `cause` under `context` and produce a 500 carrying `code`
    pub fn internal(code: &'static str, context: &str, cause: impl Display) -> Self {
        error!("{} error: {}", context, cause);
        ApiError::Internal(code)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire error code
    pub fn code(&self) -> &str {
        match self {
            ApiError::BadRequest(code) => code,
            ApiError::Unauthorized(code) | ApiError::NotFound(code) | ApiError::Internal(code) => {
                code
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.code() }));
        (self.status(), body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
