//! # Manager Contract
//!
//! The capability set every backend adapter provides to a viewset:
//! a data-access object bound to one entity type, the entity shape it
//! yields, and the factory that builds it per request.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::{BackendError, Filters, RequestContext, ViewsetError, ViewsetResult};

/// Identity values supplied outside the URL path (tenant, account, ...)
pub type AuxiliaryKeys = BTreeMap<String, String>;

/// Field name reserved for the canonical resource link
pub const HREF_FIELD: &str = "href";

/// A backend record exposed as a resource.
///
/// The viewset only ever asks for the primary key and for the values of
/// attributes its [`ModelDescriptor`] declares.
pub trait Entity: Send + Sync {
    /// Primary key as it appears in a resource path
    fn primary_key(&self) -> String;

    /// Value of a directly mapped attribute, `None` when unset
    fn attribute(&self, name: &str) -> Option<Value>;
}

/// Entity type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Entity type name
    pub name: String,

    /// Directly mapped attributes, serialized in this order
    #[serde(default)]
    pub columns: Vec<String>,

    /// Child collections, serialized as links
    #[serde(default)]
    pub relations: Vec<String>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = relations.into_iter().map(Into::into).collect();
        self
    }

    /// Reject descriptors that cannot produce a well-formed envelope
    pub fn validate(&self) -> ViewsetResult<()> {
        if self.name.trim().is_empty() {
            return Err(ViewsetError::configuration("model name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for field in self.columns.iter().chain(self.relations.iter()) {
            if field.is_empty() {
                return Err(ViewsetError::configuration(format!(
                    "model '{}' declares an empty field name",
                    self.name
                )));
            }
            if field == HREF_FIELD {
                return Err(ViewsetError::configuration(format!(
                    "model '{}' cannot declare reserved field '{}'",
                    self.name, HREF_FIELD
                )));
            }
            if !seen.insert(field.as_str()) {
                return Err(ViewsetError::configuration(format!(
                    "model '{}' declares field '{}' twice",
                    self.name, field
                )));
            }
        }

        Ok(())
    }
}

/// Manager failures
#[derive(Debug, Error)]
pub enum ManagerError {
    /// No record matches the key set
    #[error("record not found")]
    NotFound,

    /// Query execution failed
    #[error(transparent)]
    Backend(BackendError),
}

impl ManagerError {
    /// Wrap any backend failure
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

impl From<ManagerError> for ViewsetError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::NotFound => ViewsetError::NotFound,
            ManagerError::Backend(source) => ViewsetError::Backend(source),
        }
    }
}

/// Result type for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Data-access object bound to one entity type
pub trait Manager: Send + Sync {
    type Entity: Entity;

    /// Full filtered result set; `filters` are passed through untouched
    fn list(&self, other_pks: &AuxiliaryKeys, filters: &Filters)
        -> ManagerResult<Vec<Self::Entity>>;

    /// Single record addressed by ordered path keys plus auxiliary keys
    fn retrieve(&self, pks: &[String], other_pks: &AuxiliaryKeys) -> ManagerResult<Self::Entity>;

    /// Descriptor used to bind serializers
    fn model_class(&self) -> ModelDescriptor;
}

/// Builds a [`Manager`] for one request
pub trait ManagerFactory: Send + Sync {
    type Manager: Manager;

    /// Construction failure is a configuration error
    fn manager(&self, ctx: &RequestContext) -> ViewsetResult<Self::Manager>;
}

impl<M, F> ManagerFactory for F
where
    M: Manager,
    F: Fn(&RequestContext) -> ViewsetResult<M> + Send + Sync,
{
    type Manager = M;

    fn manager(&self, ctx: &RequestContext) -> ViewsetResult<M> {
        self(ctx)
    }
}

/// Entity type produced by a factory's managers
pub type EntityOf<F> = <<F as ManagerFactory>::Manager as Manager>::Entity;
