//! # ViewSet Module
//!
//! Generic read path that exposes any backend entity as a hypermedia
//! resource:
//!
//! - [`Manager`] / [`ManagerFactory`]: the backend contract
//! - [`KeyResolver`]: path keys plus out-of-path identity keys
//! - [`Paginator`]: page-number pagination with a fixed page size
//! - [`SerializerFactory`]: single vs. collection serialization
//! - [`ResourceViewSet`]: the list/retrieve orchestrator
//!
//! # Usage
//!
//! ```ignore
//! use resource_viewsets::viewset::{ResourceHandler, ResourceViewSet};
//!
//! let viewset = ResourceViewSet::builder("orders", store.factory("orders")?)
//!     .page_size(25)
//!     .build()?;
//!
//! let response = viewset.list(&ctx)?;
//! ```

pub mod keys;
pub mod manager;
pub mod pagination;
pub mod response;
pub mod serializer;
#[allow(clippy::module_inception)]
pub mod viewset;

pub use keys::{HeaderKeyResolver, KeyResolver, KeySet, PathKeyResolver};
pub use manager::{
    AuxiliaryKeys, Entity, EntityOf, Manager, ManagerError, ManagerFactory, ManagerResult,
    ModelDescriptor, HREF_FIELD,
};
pub use pagination::{paginate, InvalidPage, Paginator, DEFAULT_PAGE_PARAM, LAST_PAGE};
pub use response::{Envelope, ListEnvelope, ResourceResponse};
pub use serializer::{
    DefaultSerializerFactory, ListSerializer, ModelSerializer, Payload, ResourceSerializer,
    SerializerFactory,
};
pub use viewset::{ResourceHandler, ResourceViewSet, ViewSetBuilder};
