//! Request Context
//!
//! Immutable per-request value threaded through every viewset call.
//! Carries what the pipeline needs to build absolute links and to hand
//! the backend its keys and filters.

use std::time::Instant;

use axum::http::HeaderMap;
use url::Url;
use uuid::Uuid;

/// Ordered query parameters, passed to the backend verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pairs: Vec<(String, String)>,
}

impl Filters {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, keeping arrival order
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Builder-style append
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// First value supplied for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over `(name, value)` pairs in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether any parameter other than `name` was supplied
    pub fn has_params_other_than(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key != name)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<(String, String)> for Filters {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Context carried through list/retrieve
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request ID for tracing
    pub request_id: Uuid,

    /// Scheme, host and port of the inbound request
    base_url: Url,

    /// Request path, without query string
    path: String,

    /// Path variables in route declaration order
    path_params: Vec<(String, String)>,

    /// Query parameters in arrival order
    query: Filters,

    /// Inbound headers (auxiliary key sources)
    headers: HeaderMap,

    /// Start time for duration tracking
    started_at: Instant,
}

impl RequestContext {
    /// Create a context for `path` served under `base_url`
    pub fn new(base_url: Url, path: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            base_url,
            path: path.into(),
            path_params: Vec::new(),
            query: Filters::new(),
            headers: HeaderMap::new(),
            started_at: Instant::now(),
        }
    }

    /// Parse a full absolute URL into base, path and query
    pub fn from_url(raw: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw)?;
        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let mut base_url = url.clone();
        base_url.set_path("/");
        base_url.set_query(None);
        base_url.set_fragment(None);

        Ok(Self::new(base_url, url.path()).with_query(query))
    }

    /// Set the ordered path variables
    pub fn with_path_params(mut self, params: Vec<(String, String)>) -> Self {
        self.path_params = params;
        self
    }

    /// Set the query parameters
    pub fn with_query(mut self, query: Filters) -> Self {
        self.query = query;
        self
    }

    /// Set the inbound headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_params(&self) -> &[(String, String)] {
        &self.path_params
    }

    pub fn query(&self) -> &Filters {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Absolute URL of member `pk` under the current collection path
    pub fn member_url(&self, pk: &str) -> String {
        let mut url = self.base_url.clone();
        url.set_path(&self.path);
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(pk);
        }
        url.to_string()
    }

    /// Absolute URL of member `pk` next to the addressed resource.
    ///
    /// Replaces the last path segment, so `/models/01` with key `1`
    /// links to `/models/1`.
    pub fn sibling_url(&self, pk: &str) -> String {
        let mut url = self.base_url.clone();
        url.set_path(&self.path);
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().pop().push(pk);
        }
        url.to_string()
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_splits_components() {
        let ctx = RequestContext::from_url("https://api.example.com:8443/models/?page=2&name=x")
            .unwrap();

        assert_eq!(ctx.path(), "/models/");
        assert_eq!(ctx.query().get("page"), Some("2"));
        assert_eq!(ctx.query().get("name"), Some("x"));
        assert_eq!(ctx.base_url().as_str(), "https://api.example.com:8443/");
    }

    #[test]
    fn test_sibling_url_preserves_origin() {
        let ctx = RequestContext::from_url("http://localhost:8080/models/42?verbose=1").unwrap();
        assert_eq!(ctx.sibling_url("42"), "http://localhost:8080/models/42");
    }

    #[test]
    fn test_member_url_with_and_without_trailing_slash() {
        let ctx = RequestContext::from_url("http://h:9000/models/").unwrap();
        assert_eq!(ctx.member_url("7"), "http://h:9000/models/7");

        let ctx = RequestContext::from_url("http://h:9000/models").unwrap();
        assert_eq!(ctx.member_url("7"), "http://h:9000/models/7");
    }

    #[test]
    fn test_sibling_url_uses_canonical_key() {
        let ctx = RequestContext::from_url("http://h:9000/models/01?x=1").unwrap();
        assert_eq!(ctx.sibling_url("1"), "http://h:9000/models/1");

        let ctx = RequestContext::from_url("http://h:9000/models/%31/").unwrap();
        assert_eq!(ctx.sibling_url("1"), "http://h:9000/models/1");
    }

    #[test]
    fn test_member_url_escapes_key() {
        let ctx = RequestContext::from_url("http://h/files").unwrap();
        assert_eq!(ctx.member_url("a/b c"), "http://h/files/a%2Fb%20c");
    }

    #[test]
    fn test_filters_keep_order_and_first_value() {
        let filters = Filters::new()
            .with("status", "active")
            .with("page", "2")
            .with("status", "archived");

        assert_eq!(filters.len(), 3);
        assert_eq!(filters.get("status"), Some("active"));
        let names: Vec<_> = filters.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["status", "page", "status"]);
        assert!(filters.has_params_other_than("page"));
        assert!(!Filters::new().with("page", "1").has_params_other_than("page"));
    }
}
