//! # resource-viewsets
//!
//! Read-only REST resources over arbitrary backends. A backend implements
//! [`viewset::Manager`]; a [`viewset::ResourceViewSet`] turns it into
//! paginated, hypermedia-linked list and retrieve endpoints, and
//! [`rest_api::ResourceRouter`] mounts those on axum.

pub mod cli;
pub mod core;
pub mod memory;
pub mod observability;
pub mod rest_api;
pub mod viewset;
