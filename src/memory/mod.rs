//! # In-Memory Backend
//!
//! A [`Manager`](crate::viewset::Manager) implementation over JSON records.
//! Serves the demo binary and the test suite; real deployments plug their
//! own manager in its place.

pub mod filter;
pub mod store;

pub use filter::{FilterExpr, FilterOperator};
pub use store::{
    CollectionSchema, InMemoryManager, InMemoryManagerFactory, InMemoryStore, Record, StoreError,
};
