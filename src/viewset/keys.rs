//! # Key Resolution
//!
//! Turns a request into the ordered primary keys of its path plus any
//! identity values carried outside the URL.

use axum::http::HeaderName;

use crate::core::RequestContext;

use super::manager::AuxiliaryKeys;

/// Keys identifying one resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    /// One value per resource level, outermost first
    pub path: Vec<String>,

    /// Out-of-path identity values
    pub auxiliary: AuxiliaryKeys,
}

/// Extension point for per-entity key extraction
pub trait KeyResolver: Send + Sync {
    /// Values of the path variables in declaration order.
    ///
    /// `/models/{pk1}/children/{pk2}` yields `[pk1, pk2]`. No coercion or
    /// validation happens here; the manager owns that.
    fn path_keys(&self, ctx: &RequestContext) -> Vec<String> {
        ctx.path_params()
            .iter()
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Identity values supplied outside the path. Empty by default.
    fn auxiliary_keys(&self, _ctx: &RequestContext) -> AuxiliaryKeys {
        AuxiliaryKeys::new()
    }

    fn key_set(&self, ctx: &RequestContext) -> KeySet {
        KeySet {
            path: self.path_keys(ctx),
            auxiliary: self.auxiliary_keys(ctx),
        }
    }
}

/// Path-only resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct PathKeyResolver;

impl KeyResolver for PathKeyResolver {}

/// Reads auxiliary keys from request headers
#[derive(Debug, Clone, Default)]
pub struct HeaderKeyResolver {
    mappings: Vec<(HeaderName, String)>,
}

impl HeaderKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose header `header` as auxiliary key `key`
    pub fn map(mut self, header: HeaderName, key: impl Into<String>) -> Self {
        self.mappings.push((header, key.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl KeyResolver for HeaderKeyResolver {
    fn auxiliary_keys(&self, ctx: &RequestContext) -> AuxiliaryKeys {
        self.mappings
            .iter()
            .filter_map(|(header, key)| {
                let value = ctx.headers().get(header)?.to_str().ok()?;
                Some((key.clone(), value.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn nested_ctx() -> RequestContext {
        RequestContext::from_url("http://localhost/models/pk1/children/pk2")
            .unwrap()
            .with_path_params(vec![
                ("model_pk".to_string(), "pk1".to_string()),
                ("pk".to_string(), "pk2".to_string()),
            ])
    }

    #[test]
    fn test_path_keys_follow_declaration_order() {
        let keys = PathKeyResolver.path_keys(&nested_ctx());
        assert_eq!(keys, vec!["pk1", "pk2"]);
    }

    #[test]
    fn test_root_collection_has_no_keys() {
        let ctx = RequestContext::from_url("http://localhost/models").unwrap();
        let key_set = PathKeyResolver.key_set(&ctx);
        assert!(key_set.path.is_empty());
        assert!(key_set.auxiliary.is_empty());
    }

    #[test]
    fn test_header_resolver_maps_present_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_static("acme"));
        let ctx = nested_ctx().with_headers(headers);

        let resolver = HeaderKeyResolver::new()
            .map(HeaderName::from_static("x-tenant-id"), "tenant_id")
            .map(HeaderName::from_static("x-region"), "region");

        let key_set = resolver.key_set(&ctx);
        assert_eq!(key_set.path, vec!["pk1", "pk2"]);
        assert_eq!(key_set.auxiliary.len(), 1);
        assert_eq!(key_set.auxiliary.get("tenant_id").map(String::as_str), Some("acme"));
    }
}
