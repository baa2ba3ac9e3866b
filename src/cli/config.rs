//! Configuration file structure
//!
//! One JSON document describes the server and every resource it mounts.
//! Records are loaded into the in-memory backend at startup.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::{CollectionSchema, InMemoryStore};
use crate::rest_api::{ResourceRouter, RestServerConfig, DEFAULT_LOOKUP};
use crate::viewset::{HeaderKeyResolver, ResourceViewSet, DEFAULT_PAGE_PARAM};

use super::errors::{CliError, CliResult};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: RestServerConfig,

    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// One mounted resource backed by an in-memory collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Collection route, e.g. `/invoices/:invoice_pk/lines`
    pub prefix: String,

    /// Lookup parameter of the single-resource route
    #[serde(default = "default_lookup")]
    pub lookup: String,

    /// Page size; absent or 0 disables pagination
    #[serde(default)]
    pub page_size: Option<usize>,

    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Header name -> auxiliary key name
    #[serde(default)]
    pub auxiliary_headers: BTreeMap<String, String>,

    /// Warn when an unfiltered list returns more records than this
    #[serde(default)]
    pub scan_warning_threshold: Option<usize>,

    #[serde(flatten)]
    pub schema: CollectionSchema,

    #[serde(default)]
    pub records: Vec<Value>,
}

fn default_lookup() -> String {
    DEFAULT_LOOKUP.to_string()
}

fn default_page_param() -> String {
    DEFAULT_PAGE_PARAM.to_string()
}

impl ResourceConfig {
    fn key_resolver(&self) -> CliResult<HeaderKeyResolver> {
        self.auxiliary_headers
            .iter()
            .try_fold(HeaderKeyResolver::new(), |resolver, (header, key)| {
                let name = HeaderName::try_from(header.as_str()).map_err(|e| {
                    CliError::config_error(format!(
                        "resource '{}': invalid header '{}': {}",
                        self.prefix, header, e
                    ))
                })?;
                if key.trim().is_empty() {
                    return Err(CliError::config_error(format!(
                        "resource '{}': header '{}' maps to an empty key",
                        self.prefix, header
                    )));
                }
                Ok(resolver.map(name, key.clone()))
            })
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Checks that need no backend; wiring catches the rest
    pub fn validate(&self) -> CliResult<()> {
        self.server.validate()?;

        if self.resources.is_empty() {
            return Err(CliError::config_error("no resources configured"));
        }

        let mut prefixes = HashSet::new();
        for resource in &self.resources {
            let prefix = resource.prefix.trim_end_matches('/');
            if !prefixes.insert(prefix) {
                return Err(CliError::config_error(format!(
                    "prefix '{}' is configured twice",
                    resource.prefix
                )));
            }
            resource.schema.validate()?;
            resource.key_resolver()?;
        }

        Ok(())
    }

    /// Load every resource into a fresh store and mount it
    pub fn build_router(&self) -> CliResult<ResourceRouter> {
        let store = InMemoryStore::new();
        let mut router = ResourceRouter::new(&self.server);

        for resource in &self.resources {
            let collection = resource.prefix.trim_end_matches('/');
            store.register(collection, resource.schema.clone())?;
            for record in &resource.records {
                store.insert(collection, record.clone())?;
            }

            let mut builder =
                ResourceViewSet::builder(&resource.schema.model.name, store.factory(collection)?)
                    .page_param(&resource.page_param)
                    .key_resolver(resource.key_resolver()?);
            if let Some(page_size) = resource.page_size {
                builder = builder.page_size(page_size);
            }
            if let Some(threshold) = resource.scan_warning_threshold {
                builder = builder.scan_warning_threshold(threshold);
            }

            router = router.register_with_lookup(
                &resource.prefix,
                &resource.lookup,
                Arc::new(builder.build()?),
            )?;

            tracing::info!(
                resource = %resource.schema.model.name,
                prefix = %resource.prefix,
                records = resource.records.len(),
                "resource loaded"
            );
        }

        Ok(router)
    }
}
