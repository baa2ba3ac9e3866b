//! # In-Memory Store
//!
//! Reference backend for the viewset layer: named collections of JSON
//! object records, shared behind a lock and exposed through the
//! [`Manager`] contract.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::{Filters, RequestContext, ViewsetError, ViewsetResult};
use crate::viewset::{
    AuxiliaryKeys, Entity, Manager, ManagerError, ManagerFactory, ManagerResult, ModelDescriptor,
};

use super::filter::FilterExpr;

/// Store failures surfaced to the viewset as backend errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("unknown collection: {0}")]
    UnknownCollection(String),
}

/// How a collection's records map onto resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Descriptor handed to serializers
    pub model: ModelDescriptor,

    /// Record field holding the primary key
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Record fields matched against the leading path keys, outermost first
    #[serde(default)]
    pub parent_keys: Vec<String>,

    /// Record fields matched against auxiliary keys of the same name
    #[serde(default)]
    pub scope_keys: Vec<String>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl CollectionSchema {
    pub fn new(model: ModelDescriptor) -> Self {
        Self {
            model,
            primary_key: default_primary_key(),
            parent_keys: Vec::new(),
            scope_keys: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    pub fn with_parent_keys<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_keys = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scope_keys<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_keys = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> ViewsetResult<()> {
        self.model.validate()?;
        if self.primary_key.is_empty() {
            return Err(ViewsetError::configuration(format!(
                "collection '{}' has an empty primary key field",
                self.model.name
            )));
        }
        Ok(())
    }

    /// Auxiliary keys must cover every scope field
    fn in_scope(&self, record: &Record, other_pks: &AuxiliaryKeys) -> bool {
        self.scope_keys.iter().all(|field| match other_pks.get(field) {
            Some(wanted) => record.field_equals(field, wanted),
            None => false,
        })
    }

    /// Only declared columns are filterable; anything else is ignored
    fn filter_exprs(&self, filters: &Filters) -> Vec<FilterExpr> {
        filters
            .iter()
            .filter(|(name, _)| self.model.columns.iter().any(|column| column == name))
            .map(|(name, raw)| FilterExpr::parse(name, raw))
            .collect()
    }
}

/// One stored record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    primary_key: String,
    data: Value,
}

impl Record {
    fn new(primary_key: String, data: Map<String, Value>) -> Self {
        Self {
            primary_key,
            data: Value::Object(data),
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    fn field_equals(&self, field: &str, wanted: &str) -> bool {
        self.data
            .get(field)
            .and_then(key_text)
            .is_some_and(|text| text == wanted)
    }
}

impl Entity for Record {
    fn primary_key(&self) -> String {
        self.primary_key.clone()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.data.get(name).cloned()
    }
}

/// Textual form of a key-like value
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct Collection {
    schema: CollectionSchema,
    records: Vec<Record>,
}

type Collections = HashMap<String, Collection>;

/// Shared in-memory store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.collections.read().map_err(|_| StoreError::LockPoisoned)
    }

    /// Register (or replace) collection `name`
    pub fn register(&self, name: impl Into<String>, schema: CollectionSchema) -> ViewsetResult<()> {
        schema.validate()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| ViewsetError::backend(StoreError::LockPoisoned))?;
        collections.insert(
            name.into(),
            Collection {
                schema,
                records: Vec::new(),
            },
        );
        Ok(())
    }

    /// Append a record; it must be an object carrying the primary key
    pub fn insert(&self, name: &str, record: Value) -> ViewsetResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| ViewsetError::backend(StoreError::LockPoisoned))?;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| ViewsetError::configuration(format!("unknown collection '{}'", name)))?;

        let Value::Object(data) = record else {
            return Err(ViewsetError::configuration(format!(
                "records of '{}' must be JSON objects",
                name
            )));
        };

        let primary_key = data
            .get(&collection.schema.primary_key)
            .and_then(key_text)
            .filter(|pk| !pk.is_empty())
            .ok_or_else(|| {
                ViewsetError::configuration(format!(
                    "record in '{}' is missing primary key field '{}'",
                    name, collection.schema.primary_key
                ))
            })?;

        collection.records.push(Record::new(primary_key, data));
        Ok(())
    }

    /// Number of records in `name`
    pub fn len(&self, name: &str) -> ViewsetResult<usize> {
        let collections = self.read().map_err(ViewsetError::backend)?;
        Ok(collections.get(name).map_or(0, |c| c.records.len()))
    }

    /// Factory serving collection `name`; fails now if it is not registered
    pub fn factory(&self, name: &str) -> ViewsetResult<InMemoryManagerFactory> {
        let collections = self.read().map_err(ViewsetError::backend)?;
        if !collections.contains_key(name) {
            return Err(ViewsetError::configuration(format!(
                "no collection '{}' registered",
                name
            )));
        }
        Ok(InMemoryManagerFactory {
            store: self.clone(),
            collection: name.to_string(),
        })
    }
}

/// Builds [`InMemoryManager`]s bound to one collection
#[derive(Debug, Clone)]
pub struct InMemoryManagerFactory {
    store: InMemoryStore,
    collection: String,
}

impl ManagerFactory for InMemoryManagerFactory {
    type Manager = InMemoryManager;

    fn manager(&self, ctx: &RequestContext) -> ViewsetResult<InMemoryManager> {
        let collections = self.store.read().map_err(ViewsetError::backend)?;
        let schema = collections
            .get(&self.collection)
            .map(|c| c.schema.clone())
            .ok_or_else(|| {
                ViewsetError::configuration(format!(
                    "collection '{}' is no longer registered",
                    self.collection
                ))
            })?;

        // Collection routes nested under a parent carry its keys in the path
        let parents = ctx
            .path_params()
            .iter()
            .take(schema.parent_keys.len())
            .map(|(_, value)| value.clone())
            .collect();

        Ok(InMemoryManager {
            store: self.store.clone(),
            collection: self.collection.clone(),
            schema,
            parents,
        })
    }
}

/// Manager over one in-memory collection
#[derive(Debug, Clone)]
pub struct InMemoryManager {
    store: InMemoryStore,
    collection: String,
    schema: CollectionSchema,
    /// Parent keys bound from the request path, outermost first
    parents: Vec<String>,
}

impl InMemoryManager {
    fn with_records<T>(&self, f: impl FnOnce(&[Record]) -> ManagerResult<T>) -> ManagerResult<T> {
        let collections = self.store.read().map_err(ManagerError::backend)?;
        let collection = collections.get(&self.collection).ok_or_else(|| {
            ManagerError::backend(StoreError::UnknownCollection(self.collection.clone()))
        })?;
        f(&collection.records)
    }

    fn under_parents(&self, record: &Record, parents: &[String]) -> bool {
        self.schema
            .parent_keys
            .iter()
            .zip(parents)
            .all(|(field, wanted)| record.field_equals(field, wanted))
    }
}

impl Manager for InMemoryManager {
    type Entity = Record;

    fn list(&self, other_pks: &AuxiliaryKeys, filters: &Filters) -> ManagerResult<Vec<Record>> {
        let exprs = self.schema.filter_exprs(filters);

        self.with_records(|records| {
            Ok(records
                .iter()
                .filter(|record| self.under_parents(record, &self.parents))
                .filter(|record| self.schema.in_scope(record, other_pks))
                .filter(|record| exprs.iter().all(|expr| expr.matches(&record.data)))
                .cloned()
                .collect())
        })
    }

    fn retrieve(&self, pks: &[String], other_pks: &AuxiliaryKeys) -> ManagerResult<Record> {
        let Some((pk, parents)) = pks.split_last() else {
            return Err(ManagerError::NotFound);
        };
        if parents.len() != self.schema.parent_keys.len() {
            return Err(ManagerError::NotFound);
        }

        self.with_records(|records| {
            records
                .iter()
                .find(|record| {
                    &record.primary_key == pk
                        && self.under_parents(record, parents)
                        && self.schema.in_scope(record, other_pks)
                })
                .cloned()
                .ok_or(ManagerError::NotFound)
        })
    }

    fn model_class(&self) -> ModelDescriptor {
        self.schema.model.clone()
    }
}
