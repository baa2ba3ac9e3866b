//! # Resource Router
//!
//! Mounts viewsets on an axum [`Router`]: the collection at `prefix`,
//! single resources at `prefix/:lookup`. Each request is turned into a
//! [`RequestContext`] and the viewset runs on the blocking pool.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::{header::HOST, HeaderMap},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::core::{Filters, RequestContext, ViewsetError, ViewsetResult};
use crate::viewset::{ResourceHandler, ResourceResponse};

use super::config::RestServerConfig;

/// Default lookup parameter name for single resources
pub const DEFAULT_LOOKUP: &str = "pk";

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FORWARDED_HOST: &str = "x-forwarded-host";

/// Decides scheme and authority of generated links
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    default_scheme: String,
    trust_forwarded: bool,
    fallback_authority: String,
}

impl OriginPolicy {
    pub fn from_config(config: &RestServerConfig) -> Self {
        Self {
            default_scheme: config.default_scheme.clone(),
            trust_forwarded: config.trust_forwarded_headers,
            fallback_authority: config.socket_addr(),
        }
    }

    /// Base URL (scheme, host, port) of the inbound request
    pub fn base_url(&self, headers: &HeaderMap) -> ViewsetResult<Url> {
        let forwarded = |name: &str| {
            if !self.trust_forwarded {
                return None;
            }
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let scheme = forwarded(FORWARDED_PROTO).unwrap_or(self.default_scheme.as_str());
        let authority = forwarded(FORWARDED_HOST)
            .or_else(|| headers.get(HOST).and_then(|v| v.to_str().ok()));

        if let Some(url) = authority.and_then(|host| parse_origin(scheme, host)) {
            return Ok(url);
        }

        parse_origin(scheme, &self.fallback_authority).ok_or_else(|| {
            ViewsetError::configuration(format!(
                "cannot build links from '{}://{}'",
                scheme, self.fallback_authority
            ))
        })
    }
}

fn parse_origin(scheme: &str, authority: &str) -> Option<Url> {
    let url = Url::parse(&format!("{}://{}/", scheme, authority)).ok()?;
    // Reject authorities that smuggle a path or credentials
    (url.path() == "/" && url.username().is_empty() && url.password().is_none()).then_some(url)
}

#[derive(Clone)]
struct RouteState {
    handler: Arc<dyn ResourceHandler>,
    origin: Arc<OriginPolicy>,
}

/// Builder collecting viewset routes
pub struct ResourceRouter {
    router: Router,
    origin: Arc<OriginPolicy>,
    cors: CorsLayer,
    routes: HashSet<String>,
}

impl ResourceRouter {
    pub fn new(config: &RestServerConfig) -> Self {
        Self {
            router: Router::new(),
            origin: Arc::new(OriginPolicy::from_config(config)),
            cors: cors_layer(&config.cors_origins),
            routes: HashSet::new(),
        }
    }

    /// Mount `handler` at `prefix` with lookup parameter `pk`
    pub fn register<H>(self, prefix: &str, handler: H) -> ViewsetResult<Self>
    where
        H: ResourceHandler + 'static,
    {
        self.register_with_lookup(prefix, DEFAULT_LOOKUP, Arc::new(handler))
    }

    /// Mount `handler` at `prefix`; single resources live at `prefix/:lookup`.
    ///
    /// A nested prefix must reuse the parent's lookup name for the parent
    /// segment (`/models/:pk/children`), as axum rejects two parameter names
    /// at the same position.
    pub fn register_with_lookup(
        mut self,
        prefix: &str,
        lookup: &str,
        handler: Arc<dyn ResourceHandler>,
    ) -> ViewsetResult<Self> {
        let collection = normalize_prefix(prefix)?;
        validate_lookup(&collection, lookup)?;
        let member = format!("{}/:{}", collection, lookup);

        if !self.routes.insert(collection.clone()) {
            return Err(ViewsetError::configuration(format!(
                "prefix '{}' is registered twice",
                collection
            )));
        }

        tracing::debug!(resource = handler.name(), %collection, %member, "registered viewset");

        let state = RouteState {
            handler,
            origin: self.origin.clone(),
        };
        let routes = Router::new()
            .route(&collection, get(list_handler))
            .route(&member, get(retrieve_handler))
            .with_state(state);

        self.router = self.router.merge(routes);
        Ok(self)
    }

    /// Finished router with tracing and CORS applied
    pub fn into_router(self) -> Router {
        self.router
            .layer(TraceLayer::new_for_http())
            .layer(self.cors)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|s| s.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn normalize_prefix(prefix: &str) -> ViewsetResult<String> {
    let trimmed = prefix.trim_end_matches('/');
    if !prefix.starts_with('/') || trimmed.is_empty() {
        return Err(ViewsetError::configuration(format!(
            "prefix '{}' must start with '/' and name a collection",
            prefix
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_lookup(collection: &str, lookup: &str) -> ViewsetResult<()> {
    let valid = !lookup.is_empty()
        && lookup
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ViewsetError::configuration(format!(
            "invalid lookup parameter '{}'",
            lookup
        )));
    }

    let taken = collection
        .split('/')
        .any(|segment| segment.strip_prefix(':') == Some(lookup));
    if taken {
        return Err(ViewsetError::configuration(format!(
            "lookup '{}' already appears in '{}'",
            lookup, collection
        )));
    }
    Ok(())
}

/// Build the per-request context from axum extractors
fn build_context(
    origin: &OriginPolicy,
    uri: &axum::http::Uri,
    params: Vec<(String, String)>,
    query: Option<String>,
    headers: HeaderMap,
) -> ViewsetResult<RequestContext> {
    let base_url = origin.base_url(&headers)?;
    let filters: Filters = query
        .as_deref()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    Ok(RequestContext::new(base_url, uri.path())
        .with_path_params(params)
        .with_query(filters)
        .with_headers(headers))
}

enum Operation {
    List,
    Retrieve,
}

async fn dispatch(
    state: RouteState,
    ctx: RequestContext,
    op: Operation,
) -> ViewsetResult<ResourceResponse> {
    let handler = state.handler;
    tokio::task::spawn_blocking(move || match op {
        Operation::List => handler.list(&ctx),
        Operation::Retrieve => handler.retrieve(&ctx),
    })
    .await
    .map_err(|e| ViewsetError::internal(format!("viewset worker failed: {}", e)))?
}

/// List collection handler
async fn list_handler(
    State(state): State<RouteState>,
    OriginalUri(uri): OriginalUri,
    params: Option<Path<Vec<(String, String)>>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<ResourceResponse, ViewsetError> {
    let params = params.map(|Path(p)| p).unwrap_or_default();
    let ctx = build_context(&state.origin, &uri, params, query, headers)?;
    dispatch(state, ctx, Operation::List).await
}

/// Retrieve single resource handler
async fn retrieve_handler(
    State(state): State<RouteState>,
    OriginalUri(uri): OriginalUri,
    Path(params): Path<Vec<(String, String)>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<ResourceResponse, ViewsetError> {
    let ctx = build_context(&state.origin, &uri, params, query, headers)?;
    dispatch(state, ctx, Operation::Retrieve).await
}
