//! # Resource ViewSet
//!
//! Coordinates one read request: builds the manager, resolves keys, runs
//! the query, paginates and serializes. Holds only wiring-time
//! configuration, so one instance serves any number of concurrent
//! requests.

use std::sync::Arc;

use serde_json::Value;

use crate::core::{RequestContext, ViewsetError, ViewsetResult};

use super::keys::{KeyResolver, PathKeyResolver};
use super::manager::{EntityOf, Manager, ManagerFactory};
use super::pagination::Paginator;
use super::response::{Envelope, ListEnvelope, ResourceResponse};
use super::serializer::{DefaultSerializerFactory, Payload, SerializerFactory};

/// Object-safe read surface shared by all viewsets
pub trait ResourceHandler: Send + Sync {
    /// Resource name, used in logs
    fn name(&self) -> &str;

    /// List the collection; an invalid page becomes `400 {}`
    fn list(&self, ctx: &RequestContext) -> ViewsetResult<ResourceResponse>;

    /// Fetch the resource addressed by the request path
    fn retrieve(&self, ctx: &RequestContext) -> ViewsetResult<ResourceResponse>;
}

/// Generic read-only viewset over a manager factory
pub struct ResourceViewSet<F: ManagerFactory> {
    name: String,
    manager_factory: F,
    key_resolver: Arc<dyn KeyResolver>,
    serializer_factory: Arc<dyn SerializerFactory<EntityOf<F>>>,
    paginator: Paginator,
    scan_warning_threshold: Option<usize>,
}

impl<F: ManagerFactory> ResourceViewSet<F> {
    /// Start wiring a viewset named `name`
    pub fn builder(name: impl Into<String>, manager_factory: F) -> ViewSetBuilder<F> {
        ViewSetBuilder::new(name, manager_factory)
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Count, page and serialize the filtered collection.
    ///
    /// Fails with [`ViewsetError::InvalidPage`] when the requested page is
    /// out of range; [`ResourceHandler::list`] turns that into a response.
    pub fn list_envelope(&self, ctx: &RequestContext) -> ViewsetResult<ListEnvelope> {
        let manager = self.manager_factory.manager(ctx)?;
        let model = manager.model_class();
        model.validate()?;

        let other_pks = self.key_resolver.auxiliary_keys(ctx);
        let filters = ctx.query();
        let entities = manager.list(&other_pks, filters)?;

        let count = entities.len();
        self.check_scan_size(ctx, count);

        let page = self.paginator.paginate(entities, filters)?;
        let data = self
            .serializer_factory
            .build(Payload::Collection(page), &model, ctx)
            .data()?;

        let results = match data {
            Value::Array(items) => items,
            _ => {
                return Err(ViewsetError::internal(format!(
                    "list serializer for '{}' did not produce an array",
                    model.name
                )))
            }
        };

        tracing::debug!(
            resource = %self.name,
            request_id = %ctx.request_id,
            count,
            returned = results.len(),
            elapsed_ms = ctx.elapsed_ms() as u64,
            "list"
        );

        Ok(ListEnvelope::new(count, self.paginator.page_size(), results))
    }

    /// Resolve keys, fetch one record and serialize it
    pub fn retrieve_envelope(&self, ctx: &RequestContext) -> ViewsetResult<Envelope> {
        let manager = self.manager_factory.manager(ctx)?;
        let model = manager.model_class();
        model.validate()?;

        let keys = self.key_resolver.key_set(ctx);
        let entity = manager.retrieve(&keys.path, &keys.auxiliary)?;

        let data = self
            .serializer_factory
            .build(Payload::Single(entity), &model, ctx)
            .data()?;

        tracing::debug!(
            resource = %self.name,
            request_id = %ctx.request_id,
            keys = ?keys.path,
            elapsed_ms = ctx.elapsed_ms() as u64,
            "retrieve"
        );

        match data {
            Value::Object(envelope) => Ok(envelope),
            _ => Err(ViewsetError::internal(format!(
                "serializer for '{}' did not produce an object",
                model.name
            ))),
        }
    }

    /// Warn when an unfiltered query materializes a large result set
    fn check_scan_size(&self, ctx: &RequestContext, count: usize) {
        let Some(threshold) = self.scan_warning_threshold else {
            return;
        };

        if count > threshold && !ctx.query().has_params_other_than(self.paginator.page_param()) {
            tracing::warn!(
                resource = %self.name,
                request_id = %ctx.request_id,
                count,
                threshold,
                "unfiltered list materialized a large result set"
            );
        }
    }
}

impl<F: ManagerFactory> ResourceHandler for ResourceViewSet<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, ctx: &RequestContext) -> ViewsetResult<ResourceResponse> {
        match self.list_envelope(ctx) {
            Ok(envelope) => serde_json::to_value(envelope)
                .map(ResourceResponse::ok)
                .map_err(|e| ViewsetError::internal(e.to_string())),
            Err(ViewsetError::InvalidPage(page)) => {
                tracing::debug!(
                    resource = %self.name,
                    request_id = %ctx.request_id,
                    page = %page,
                    "invalid page"
                );
                Ok(ResourceResponse::bad_request())
            }
            Err(err) => Err(err),
        }
    }

    fn retrieve(&self, ctx: &RequestContext) -> ViewsetResult<ResourceResponse> {
        let envelope = self.retrieve_envelope(ctx)?;
        Ok(ResourceResponse::ok(Value::Object(envelope)))
    }
}

/// Wiring-time configuration of a [`ResourceViewSet`]
pub struct ViewSetBuilder<F: ManagerFactory> {
    name: String,
    manager_factory: F,
    key_resolver: Arc<dyn KeyResolver>,
    serializer_factory: Arc<dyn SerializerFactory<EntityOf<F>>>,
    page_size: Option<usize>,
    page_param: Option<String>,
    scan_warning_threshold: Option<usize>,
}

impl<F: ManagerFactory> ViewSetBuilder<F> {
    pub fn new(name: impl Into<String>, manager_factory: F) -> Self {
        Self {
            name: name.into(),
            manager_factory,
            key_resolver: Arc::new(PathKeyResolver),
            serializer_factory: Arc::new(DefaultSerializerFactory),
            page_size: None,
            page_param: None,
            scan_warning_threshold: None,
        }
    }

    /// Enable pagination; `0` leaves it disabled
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Query parameter carrying the page number
    pub fn page_param(mut self, param: impl Into<String>) -> Self {
        self.page_param = Some(param.into());
        self
    }

    pub fn key_resolver<K>(mut self, resolver: K) -> Self
    where
        K: KeyResolver + 'static,
    {
        self.key_resolver = Arc::new(resolver);
        self
    }

    pub fn serializer_factory<S>(mut self, factory: S) -> Self
    where
        S: SerializerFactory<EntityOf<F>> + 'static,
    {
        self.serializer_factory = Arc::new(factory);
        self
    }

    /// Log a warning when an unfiltered list exceeds `threshold` records
    pub fn scan_warning_threshold(mut self, threshold: usize) -> Self {
        self.scan_warning_threshold = Some(threshold);
        self
    }

    pub fn build(self) -> ViewsetResult<ResourceViewSet<F>> {
        if self.name.trim().is_empty() {
            return Err(ViewsetError::configuration("viewset name cannot be empty"));
        }

        let mut paginator = Paginator::new(self.page_size);
        if let Some(param) = self.page_param {
            if param.trim().is_empty() {
                return Err(ViewsetError::configuration(format!(
                    "viewset '{}' has an empty page parameter",
                    self.name
                )));
            }
            paginator = paginator.with_page_param(param);
        }

        Ok(ResourceViewSet {
            name: self.name,
            manager_factory: self.manager_factory,
            key_resolver: self.key_resolver,
            serializer_factory: self.serializer_factory,
            paginator,
            scan_warning_threshold: self.scan_warning_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::core::Filters;
    use crate::viewset::keys::HeaderKeyResolver;
    use crate::viewset::manager::{
        AuxiliaryKeys, Entity, ManagerError, ManagerResult, ModelDescriptor,
    };
    use crate::viewset::serializer::ResourceSerializer;

    #[derive(Debug, Clone)]
    struct Widget {
        id: u32,
    }

    impl Entity for Widget {
        fn primary_key(&self) -> String {
            self.id.to_string()
        }

        fn attribute(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(json!(self.id)),
                "label" => Some(json!(format!("widget-{}", self.id))),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct Calls {
        list: Vec<(AuxiliaryKeys, Filters)>,
        retrieve: Vec<(Vec<String>, AuxiliaryKeys)>,
    }

    struct WidgetManager {
        total: u32,
        calls: Arc<Mutex<Calls>>,
        model: ModelDescriptor,
    }

    impl Manager for WidgetManager {
        type Entity = Widget;

        fn list(&self, other_pks: &AuxiliaryKeys, filters: &Filters) -> ManagerResult<Vec<Widget>> {
            self.calls
                .lock()
                .unwrap()
                .list
                .push((other_pks.clone(), filters.clone()));
            Ok((1..=self.total).map(|id| Widget { id }).collect())
        }

        fn retrieve(&self, pks: &[String], other_pks: &AuxiliaryKeys) -> ManagerResult<Widget> {
            self.calls
                .lock()
                .unwrap()
                .retrieve
                .push((pks.to_vec(), other_pks.clone()));
            let id = pks
                .last()
                .and_then(|pk| pk.parse::<u32>().ok())
                .filter(|id| (1..=self.total).contains(id))
                .ok_or(ManagerError::NotFound)?;
            Ok(Widget { id })
        }

        fn model_class(&self) -> ModelDescriptor {
            self.model.clone()
        }
    }

    fn widget_model() -> ModelDescriptor {
        ModelDescriptor::new("Widget").with_columns(["id", "label"])
    }

    fn factory(
        total: u32,
        calls: Arc<Mutex<Calls>>,
    ) -> impl Fn(&RequestContext) -> ViewsetResult<WidgetManager> + Send + Sync {
        move |_ctx: &RequestContext| {
            Ok(WidgetManager {
                total,
                calls: calls.clone(),
                model: widget_model(),
            })
        }
    }

    fn ctx(url: &str) -> RequestContext {
        RequestContext::from_url(url).unwrap()
    }

    #[test]
    fn test_list_paginates_and_counts_full_set() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(23, calls))
            .page_size(10)
            .build()
            .unwrap();

        let first = viewset.list_envelope(&ctx("http://h/widgets")).unwrap();
        assert_eq!(first.count, 23);
        assert_eq!(first.page, Some(10));
        assert_eq!(first.results.len(), 10);
        assert_eq!(first.results[0]["href"], "http://h/widgets/1");

        let third = viewset.list_envelope(&ctx("http://h/widgets?page=3")).unwrap();
        assert_eq!(third.count, 23);
        assert_eq!(third.results.len(), 3);
        assert_eq!(third.results[2]["label"], "widget-23");
    }

    #[test]
    fn test_list_invalid_page_is_bad_request() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(23, calls))
            .page_size(10)
            .build()
            .unwrap();

        for page in ["0", "4", "abc"] {
            let response = viewset
                .list(&ctx(&format!("http://h/widgets?page={}", page)))
                .unwrap();
            assert_eq!(response.status, StatusCode::BAD_REQUEST);
            assert_eq!(response.body, json!({}));
        }

        assert!(matches!(
            viewset.list_envelope(&ctx("http://h/widgets?page=4")),
            Err(ViewsetError::InvalidPage(_))
        ));
    }

    #[test]
    fn test_list_without_pagination_returns_everything() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(57, calls))
            .build()
            .unwrap();

        let response = viewset.list(&ctx("http://h/widgets?page=12")).unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["count"], 57);
        assert_eq!(response.body["page"], Value::Null);
        assert_eq!(response.body["results"].as_array().unwrap().len(), 57);
    }

    #[test]
    fn test_list_passes_filters_and_auxiliary_keys_verbatim() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(3, calls.clone()))
            .key_resolver(
                HeaderKeyResolver::new().map(HeaderName::from_static("x-tenant-id"), "tenant"),
            )
            .build()
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_static("t-9"));
        let request = ctx("http://h/widgets?color=red&page=1&color=blue").with_headers(headers);
        viewset.list(&request).unwrap();

        let calls = calls.lock().unwrap();
        let (other_pks, filters) = &calls.list[0];
        assert_eq!(other_pks.get("tenant").map(String::as_str), Some("t-9"));
        let pairs: Vec<_> = filters.iter().collect();
        assert_eq!(pairs, vec![("color", "red"), ("page", "1"), ("color", "blue")]);
    }

    #[test]
    fn test_retrieve_resolves_nested_keys() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(5, calls.clone()))
            .build()
            .unwrap();

        let request = ctx("http://h:81/boxes/b1/widgets/4").with_path_params(vec![
            ("box_pk".to_string(), "b1".to_string()),
            ("pk".to_string(), "4".to_string()),
        ]);
        let response = viewset.retrieve(&request).unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.body,
            json!({"href": "http://h:81/boxes/b1/widgets/4", "id": 4, "label": "widget-4"})
        );
        assert_eq!(calls.lock().unwrap().retrieve[0].0, vec!["b1", "4"]);
    }

    #[test]
    fn test_retrieve_is_idempotent() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(5, calls))
            .build()
            .unwrap();
        let request = ctx("http://h/widgets/2")
            .with_path_params(vec![("pk".to_string(), "2".to_string())]);

        let first = viewset.retrieve(&request).unwrap();
        let second = viewset.retrieve(&request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_retrieve_not_found_propagates() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(5, calls))
            .build()
            .unwrap();
        let request = ctx("http://h/widgets/99")
            .with_path_params(vec![("pk".to_string(), "99".to_string())]);

        assert!(matches!(
            viewset.retrieve(&request),
            Err(ViewsetError::NotFound)
        ));
    }

    #[test]
    fn test_manager_factory_failure_is_fatal() {
        let factory = |_ctx: &RequestContext| -> ViewsetResult<WidgetManager> {
            Err(ViewsetError::configuration("no session bound"))
        };
        let viewset = ResourceViewSet::builder("widgets", factory).build().unwrap();

        assert!(matches!(
            viewset.list(&ctx("http://h/widgets")),
            Err(ViewsetError::Configuration(_))
        ));
    }

    #[test]
    fn test_backend_failure_propagates_unchanged() {
        struct Broken;

        impl Manager for Broken {
            type Entity = Widget;

            fn list(&self, _: &AuxiliaryKeys, _: &Filters) -> ManagerResult<Vec<Widget>> {
                Err(ManagerError::backend(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "query timed out",
                )))
            }

            fn retrieve(&self, _: &[String], _: &AuxiliaryKeys) -> ManagerResult<Widget> {
                Err(ManagerError::NotFound)
            }

            fn model_class(&self) -> ModelDescriptor {
                widget_model()
            }
        }

        let viewset = ResourceViewSet::builder("widgets", |_: &RequestContext| -> ViewsetResult<Broken> {
            Ok(Broken)
        })
            .page_size(5)
            .build()
            .unwrap();

        let err = viewset.list(&ctx("http://h/widgets")).unwrap_err();
        assert!(matches!(err, ViewsetError::Backend(_)));
        assert!(err.to_string().contains("query timed out"));
    }

    #[test]
    fn test_malformed_descriptor_is_configuration_error() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let factory = move |_: &RequestContext| -> ViewsetResult<WidgetManager> {
            Ok(WidgetManager {
                total: 1,
                calls: calls.clone(),
                model: ModelDescriptor::new("Widget").with_columns(["href"]),
            })
        };
        let viewset = ResourceViewSet::builder("widgets", factory).build().unwrap();

        assert!(matches!(
            viewset.list(&ctx("http://h/widgets")),
            Err(ViewsetError::Configuration(_))
        ));
    }

    #[test]
    fn test_custom_serializer_factory_is_used() {
        struct CountOnly(usize);

        impl ResourceSerializer for CountOnly {
            fn data(&self) -> ViewsetResult<Value> {
                Ok(Value::Array(vec![json!({"href": "x", "n": self.0})]))
            }
        }

        struct CountingFactory;

        impl SerializerFactory<Widget> for CountingFactory {
            fn build<'a>(
                &self,
                payload: Payload<Widget>,
                _model: &'a ModelDescriptor,
                _ctx: &'a RequestContext,
            ) -> Box<dyn crate::viewset::serializer::ResourceSerializer + 'a>
            where
                Widget: 'a,
            {
                match payload {
                    Payload::Collection(items) => Box::new(CountOnly(items.len())),
                    Payload::Single(_) => Box::new(CountOnly(1)),
                }
            }
        }

        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(4, calls))
            .serializer_factory(CountingFactory)
            .build()
            .unwrap();

        let envelope = viewset.list_envelope(&ctx("http://h/widgets")).unwrap();
        assert_eq!(envelope.results, vec![json!({"href": "x", "n": 4})]);
    }

    #[test]
    fn test_builder_rejects_bad_wiring() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        assert!(ResourceViewSet::builder("", factory(1, calls.clone()))
            .build()
            .is_err());
        assert!(ResourceViewSet::builder("widgets", factory(1, calls))
            .page_param(" ")
            .build()
            .is_err());
    }

    #[test]
    fn test_zero_page_size_disables_pagination() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let viewset = ResourceViewSet::builder("widgets", factory(12, calls))
            .page_size(0)
            .build()
            .unwrap();

        assert!(!viewset.paginator().is_enabled());
        let envelope = viewset.list_envelope(&ctx("http://h/widgets")).unwrap();
        assert_eq!(envelope.results.len(), 12);
        assert_eq!(envelope.page, None);
    }
}
