//! Request handling module that provides access to HTTP request information and path parameters.
//!
//! This module contains the core types for working with requests inside the pipeline:
//! - `RequestContext`: the per-request state every middleware and handler receives
//! - `PathParams`: the decoded parameters captured by the route pattern

use crate::body::ResponseBody;
use crate::error::ExtractError;
use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri, Version};
use serde::Deserialize;
use tracing::debug;

/// Per-request state passed through the middleware pipeline.
///
/// A context is created after the route resolved, owns the request descriptor and a
/// response draft, and is dropped once the response has been produced. It is never
/// shared between requests.
#[derive(Debug)]
pub struct RequestContext {
    parts: http::request::Parts,
    body: Bytes,
    query: Vec<(String, String)>,
    path_params: PathParams,
    response: Response<ResponseBody>,
    extensions: Extensions,
}

impl RequestContext {
    /// Creates a new context from the request and the params extracted by the router.
    ///
    /// The response draft starts as `200 OK` with no headers and an empty body.
    pub fn new(request: Request<Bytes>, path_params: PathParams) -> Self {
        let (parts, body) = request.into_parts();
        let query = parse_query(parts.uri.query());
        Self {
            parts,
            body,
            query,
            path_params,
            response: Response::new(ResponseBody::empty()),
            extensions: Extensions::new(),
        }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the normalized path the router matched against
    pub fn path(&self) -> &str {
        request_path(&self.parts.uri)
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the raw request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the query string decoded into ordered key/value pairs
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the first query value for `name`
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Deserializes the query string with `serde_qs`, which understands nested keys like `a[b]=c`.
    pub fn query_as<T>(&self) -> Result<T, ExtractError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let query = self.parts.uri.query().ok_or(ExtractError::MissingQuery)?;
        serde_qs::from_str::<T>(query).map_err(ExtractError::invalid_query)
    }

    /// Deserializes the request body as json.
    pub fn json<T>(&self) -> Result<T, ExtractError>
    where
        T: for<'de> Deserialize<'de>,
    {
        Ok(serde_json::from_slice::<T>(&self.body)?)
    }

    /// Returns a reference to the path parameters extracted from the request URL
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Shorthand for `path_params().get(name)`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// The response draft. Returned as-is when the handler produces no explicit response.
    pub fn response(&self) -> &Response<ResponseBody> {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response<ResponseBody> {
        &mut self.response
    }

    pub fn set_status(&mut self, status: StatusCode) {
        *self.response.status_mut() = status;
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response.headers_mut().insert(name, value);
    }

    pub fn set_body(&mut self, body: impl Into<ResponseBody>) {
        *self.response.body_mut() = body.into();
    }

    /// Type-keyed slot that collaborating middleware populate (session, principal, rate-limit state, ...).
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Consumes the context and returns the response draft.
    pub fn into_response(self) -> Response<ResponseBody> {
        self.response
    }
}

fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Vec::new();
    };

    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_else(|e| {
        debug!(cause = %e, query, "ignore malformed query string");
        Vec::new()
    })
}

/// Returns the path the router should match for `uri`.
///
/// An absolute-form URI contributes only its path; an empty path becomes `/`.
pub(crate) fn request_path(uri: &Uri) -> &str {
    let path = uri.path();
    if path.starts_with('/') { path } else { "/" }
}

/// Normalizes a raw request target into a routable path.
///
/// The scheme and authority of an absolute URL are stripped, as are the query string and the
/// fragment. Anything that does not yield a path starting with `/` normalizes to `/`.
///
/// ```
/// use micro_router::normalize_path;
///
/// assert_eq!(normalize_path("http://localhost:8080/users/42?debug=1"), "/users/42");
/// assert_eq!(normalize_path("/files/a.txt#top"), "/files/a.txt");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(raw: &str) -> &str {
    let without_scheme = match raw.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => rest.find(['/', '?', '#']).map_or("", |start| &rest[start..]),
        _ => raw,
    };

    let end = without_scheme.find(['?', '#']).unwrap_or(without_scheme.len());
    let path = &without_scheme[..end];

    if path.starts_with('/') { path } else { "/" }
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`, as in RFC 3986.
fn is_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// Path parameters are named segments in the route pattern. For example, in the pattern
/// `/users/:id`, `id` is a path parameter; a trailing `*` captures the rest of the path
/// under the name `*`. Values are percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    pub(crate) fn from_vec(params: Vec<(String, String)>) -> Self {
        Self { params }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    /// Iterates over `(name, value)` pairs in pattern order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(uri: &str, body: &'static str) -> RequestContext {
        let request =
            Request::builder().method(Method::POST).uri(uri).body(Bytes::from_static(body.as_bytes())).unwrap();
        let params = PathParams::from_vec(vec![("id".into(), "42".into())]);
        RequestContext::new(request, params)
    }

    #[test]
    fn test_response_draft_defaults() {
        let ctx = context("/users/42", "");

        assert_eq!(ctx.response().status(), StatusCode::OK);
        assert!(ctx.response().headers().is_empty());
        assert_eq!(ctx.response().body().as_bytes(), Some(&b""[..]));
    }

    #[test]
    fn test_request_accessors() {
        let ctx = context("http://localhost/users/42?name=hello+world&zip=1&zip=2", "");

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/users/42");
        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(ctx.param("missing"), None);
        assert_eq!(ctx.query_param("name"), Some("hello world"));
        assert_eq!(ctx.query_param("zip"), Some("1"));
        assert_eq!(ctx.query().len(), 3);
    }

    #[test]
    fn test_typed_extraction() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct User {
            name: String,
            zip: String,
        }

        let ctx = context("/users?name=hello&zip=world", r#"{"name":"json","zip":"body"}"#);

        let from_query: User = ctx.query_as().unwrap();
        assert_eq!(from_query, User { name: "hello".into(), zip: "world".into() });

        let from_body: User = ctx.json().unwrap();
        assert_eq!(from_body, User { name: "json".into(), zip: "body".into() });
    }

    #[test]
    fn test_extraction_errors() {
        let ctx = context("/users", "not json");

        assert!(matches!(ctx.query_as::<Vec<(String, String)>>(), Err(ExtractError::MissingQuery)));
        assert!(matches!(ctx.json::<serde_json::Value>(), Err(ExtractError::InvalidJson { .. })));
    }

    #[test]
    fn test_response_draft_mutation() {
        let mut ctx = context("/users/42", "");

        ctx.set_status(StatusCode::CREATED);
        ctx.insert_header(http::header::LOCATION, HeaderValue::from_static("/users/42"));
        ctx.set_body("created");

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[http::header::LOCATION], "/users/42");
        assert_eq!(response.body().as_bytes(), Some(&b"created"[..]));
    }

    #[test]
    fn test_extensions() {
        #[derive(Clone, Debug, PartialEq)]
        struct Principal(&'static str);

        let mut ctx = context("/", "");
        assert!(ctx.extensions().get::<Principal>().is_none());

        ctx.extensions_mut().insert(Principal("zava"));
        assert_eq!(ctx.extensions().get::<Principal>(), Some(&Principal("zava")));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/users/42"), "/users/42");
        assert_eq!(normalize_path("/users/42?x=1"), "/users/42");
        assert_eq!(normalize_path("https://example.com/a/b?c=d#e"), "/a/b");
        assert_eq!(normalize_path("https://example.com"), "/");
        assert_eq!(normalize_path("https://example.com?x=1"), "/");
        assert_eq!(normalize_path("?x=1"), "/");
        assert_eq!(normalize_path("users"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_normalize_path_keeps_embedded_urls() {
        assert_eq!(normalize_path("/proxy/http://x/y"), "/proxy/http://x/y");
        assert_eq!(normalize_path("/proxy/http://x/y?z=1"), "/proxy/http://x/y");
        assert_eq!(normalize_path("svn+ssh://host/repo"), "/repo");
        assert_eq!(normalize_path("1http://host/a"), "/");
        assert_eq!(normalize_path("://host/a"), "/");
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path(&Uri::from_static("http://example.com")), "/");
        assert_eq!(request_path(&Uri::from_static("http://example.com/a?b")), "/a");
        assert_eq!(request_path(&Uri::from_static("/a/b")), "/a/b");
    }

    #[test]
    fn test_path_params() {
        let params = PathParams::from_vec(vec![("id".into(), "42".into()), ("*".into(), "a/b".into())]);

        assert_eq!(params.len(), 2);
        assert!(!params.is_empty());
        assert_eq!(params.get("*"), Some("a/b"));
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("id", "42"), ("*", "a/b")]);
        assert!(PathParams::empty().is_empty());
    }
}
