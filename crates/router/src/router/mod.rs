//! Route registration and `(method, path)` resolution.
//!
//! Patterns are made of `/`-separated segments: literals, `:name` parameters matching exactly one
//! segment, and a trailing `*` wildcard matching one or more segments. When several routes could
//! match the same path, static segments win over parameters, which win over wildcards.
//!
//! ```
//! use futures::FutureExt;
//! use http::Method;
//! use micro_router::{Router, handler_fn, route};
//!
//! let mut router = Router::new();
//! router.get("/users/:id", route().to(handler_fn(|_ctx| async { Ok("user") }.boxed()))).unwrap();
//!
//! let found = router.at(&Method::GET, "/users/42").unwrap();
//! assert_eq!(found.params().get("id"), Some("42"));
//! ```

mod pattern;
mod registry;
mod trie;

pub use pattern::WILDCARD;
pub use registry::RouteInfo;

use crate::PathParams;
use crate::error::RouteError;
use crate::handler::RequestHandler;
use crate::middleware::Middleware;
use http::Method;
use pattern::{decode, parse_pattern, split_path};
use registry::RouteRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use trie::Node;

/// Methods a route can be registered for, in the order they are reported.
pub const SUPPORTED_METHODS: [Method; 6] =
    [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH, Method::OPTIONS];

/// A registered endpoint: the handler and the middleware wrapping it.
pub struct Route {
    method: Method,
    pattern: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn RequestHandler>,
}

impl Route {
    pub(crate) fn new(
        method: Method,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        Self { method, pattern: pattern.to_owned(), middlewares, handler }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The pattern as it was registered.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    /// Route middleware, outermost first.
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    pub fn middleware_names(&self) -> Vec<String> {
        self.middlewares.iter().map(|m| m.name().to_owned()).collect()
    }

    fn info(&self) -> RouteInfo {
        RouteInfo::new(self.method.clone(), &self.pattern, self.middleware_names())
    }

    fn same_endpoint(&self, other: &Route) -> bool {
        self.method == other.method
            && self.pattern == other.pattern
            && Arc::ptr_eq(&self.handler, &other.handler)
            && self.middlewares.len() == other.middlewares.len()
            && self.middlewares.iter().zip(&other.middlewares).all(|(a, b)| a.name() == b.name())
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("middlewares", &self.middleware_names())
            .finish_non_exhaustive()
    }
}

/// Collects the middleware and the handler of one route before registration.
#[derive(Default)]
pub struct RouteBuilder {
    middlewares: Vec<Arc<dyn Middleware>>,
    handler: Option<Arc<dyn RequestHandler>>,
}

/// Starts a route definition. Attach middleware with [`RouteBuilder::with`] and finish with
/// [`RouteBuilder::to`].
pub fn route() -> RouteBuilder {
    RouteBuilder::default()
}

impl RouteBuilder {
    /// Appends a route middleware. Middleware attached first runs outermost.
    #[must_use]
    pub fn with<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.with_arc(Arc::new(middleware))
    }

    /// Appends a middleware that is shared with other routes.
    #[must_use]
    pub fn with_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sets the handler, replacing any handler set before.
    #[must_use]
    pub fn to<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("middlewares", &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// The outcome of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    route: Arc<Route>,
    params: PathParams,
}

impl RouteMatch {
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Percent-decoded path parameters, in path order.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn middleware_names(&self) -> Vec<String> {
        self.route.middleware_names()
    }

    pub fn into_parts(self) -> (Arc<Route>, PathParams) {
        (self.route, self.params)
    }
}

impl PartialEq for RouteMatch {
    fn eq(&self, other: &Self) -> bool {
        let same_route = Arc::ptr_eq(&self.route, &other.route) || self.route.same_endpoint(&other.route);
        same_route && self.params == other.params
    }
}

/// Generates one registration method per HTTP method.
macro_rules! method_routes {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers a `", stringify!($method), "` route.")]
            pub fn $name(
                &mut self,
                pattern: &str,
                builder: $crate::router::RouteBuilder,
            ) -> Result<&mut Self, $crate::error::RouteError> {
                self.route(http::Method::$method, pattern, builder)
            }
        )*
    };
}

pub(crate) use method_routes;

/// The route table: a prefix tree for lookup plus a flat registry for introspection.
///
/// A `Router` is built with `&mut self` and then shared read-only, usually through an
/// [`App`](crate::App).
#[derive(Debug, Clone, Default)]
pub struct Router {
    root: Node,
    registry: RouteRegistry,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `builder` for `method` at `pattern`.
    ///
    /// Nothing is modified when an error is returned. Registering the same method and pattern
    /// twice replaces the earlier route.
    pub fn route(&mut self, method: Method, pattern: &str, builder: RouteBuilder) -> Result<&mut Self, RouteError> {
        let RouteBuilder { middlewares, handler } = builder;
        let Some(handler) = handler else {
            return Err(RouteError::missing_handler(method, pattern));
        };
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(RouteError::unsupported_method(method, pattern));
        }

        let segments = parse_pattern(pattern)?;
        self.root.check(pattern, &segments)?;

        let route = Arc::new(Route::new(method.clone(), pattern, middlewares, handler));
        let info = route.info();
        match self.root.insert(&segments, method.clone(), route) {
            Some(replaced) => {
                warn!(
                    method = %method,
                    pattern,
                    replaced = replaced.pattern(),
                    "route registered twice, replace the earlier one"
                );
                self.registry.remove(replaced.method(), replaced.pattern());
            }
            None => debug!(method = %method, pattern, middlewares = ?info.middlewares(), "route registered"),
        }
        self.registry.record(info);

        Ok(self)
    }

    method_routes! {
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        options => OPTIONS,
    }

    /// Resolves `path` for `method`.
    ///
    /// `path` is matched as is: it must already be stripped of scheme, authority and query (see
    /// [`normalize_path`](crate::normalize_path)).
    pub fn at(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let segments = split_path(path).collect::<Vec<_>>();
        let mut captures = Vec::new();
        let accept = &mut |node: &Node| node.route(method).is_some();
        let Some(node) = self.root.find(path, &segments, &mut captures, accept) else {
            trace!(method = %method, path, "no route matched");
            return None;
        };
        let route = Arc::clone(node.route(method)?);

        let params = captures.into_iter().map(|(name, raw)| (name.to_owned(), decode(raw))).collect::<Vec<_>>();
        trace!(method = %method, path, pattern = route.pattern(), "route matched");
        Some(RouteMatch { route, params: PathParams::from_vec(params) })
    }

    /// Every method registered on a route whose pattern matches `path`.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let segments = split_path(path).collect::<Vec<_>>();
        let mut seen = Vec::new();
        self.root.find(path, &segments, &mut Vec::new(), &mut |node: &Node| {
            seen.extend(node.methods().cloned());
            // keep walking so every reachable node is visited
            false
        });

        SUPPORTED_METHODS.into_iter().filter(|method| seen.contains(method)).collect()
    }

    /// Registered routes sorted by pattern, then method.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.registry.list()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }
}
