//! # REST API Module
//!
//! axum adapter for viewsets: route registration, request context
//! extraction and the HTTP server.

pub mod config;
pub mod router;
pub mod server;

pub use config::RestServerConfig;
pub use router::{OriginPolicy, ResourceRouter, DEFAULT_LOOKUP};
pub use server::RestServer;
