//! # Response Envelopes
//!
//! Outbound shapes of the list and retrieve operations.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Collection envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEnvelope {
    /// Size of the full filtered result set, not of the page
    pub count: usize,

    /// Configured page size, `null` when pagination is disabled
    pub page: Option<usize>,

    /// Per-entity envelopes
    pub results: Vec<Value>,
}

impl ListEnvelope {
    pub fn new(count: usize, page: Option<usize>, results: Vec<Value>) -> Self {
        Self {
            count,
            page,
            results,
        }
    }
}

/// Single-entity envelope: `href` plus fields
pub type Envelope = Map<String, Value>;

/// A controlled viewset response
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ResourceResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// `400` with an empty object body
    pub fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({}),
        }
    }
}

impl IntoResponse for ResourceResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
