//! # Core Module
//!
//! Per-request context and the error taxonomy shared by every layer.

pub mod context;
pub mod error;

pub use context::{Filters, RequestContext};
pub use error::{BackendError, ErrorResponse, ViewsetError, ViewsetResult};
