//! Core Error Types
//!
//! Error taxonomy for the viewset pipeline and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Boxed error raised by a backend adapter
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Viewset result type
pub type ViewsetResult<T> = Result<T, ViewsetError>;

/// Viewset errors
#[derive(Debug, Error)]
pub enum ViewsetError {
    /// Requested page outside `1..=num_pages`, or not a page number
    #[error("Invalid page: {0}")]
    InvalidPage(String),

    /// Key set resolved to no backend record
    #[error("Resource not found")]
    NotFound,

    /// Missing manager binding, malformed descriptor, bad wiring
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure raised by the manager, passed through untouched
    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),

    /// Serialization or worker failure inside the pipeline
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ViewsetError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wrap any backend failure
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ViewsetError::InvalidPage(_) => StatusCode::BAD_REQUEST,
            ViewsetError::NotFound => StatusCode::NOT_FOUND,
            ViewsetError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ViewsetError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ViewsetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ViewsetError::InvalidPage(_) => "INVALID_PAGE",
            ViewsetError::NotFound => "NOT_FOUND",
            ViewsetError::Configuration(_) => "CONFIGURATION_ERROR",
            ViewsetError::Backend(_) => "BACKEND_ERROR",
            ViewsetError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&ViewsetError> for ErrorResponse {
    fn from(err: &ViewsetError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code(),
        }
    }
}

impl IntoResponse for ViewsetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            // Invalid page is answered with an empty object
            ViewsetError::InvalidPage(_) => (status, Json(json!({}))).into_response(),
            other => {
                if status.is_server_error() {
                    tracing::error!(code = other.code(), error = %other, "request failed");
                }
                (status, Json(ErrorResponse::from(&other))).into_response()
            }
        }
    }
}
