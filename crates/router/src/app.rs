//! The application: route table, global middleware and lookup cache behind one entry point.
//!
//! Routes and global middleware are registered through `&mut self` during setup. Afterwards
//! the app is shared, typically in an [`Arc`], and [`App::handle`] runs concurrently from any
//! number of tasks. The route table can still be replaced at runtime with [`App::reload`].

use crate::body::ResponseBody;
use crate::cache::{LookupCache, LruLookupCache, RouteCache, cache_key};
use crate::config::AppConfig;
use crate::error::{Cancelled, RouteError};
use crate::handler::HandlerError;
use crate::middleware::{Middleware, Next};
use crate::request::{normalize_path, request_path};
use crate::responder::text_response;
use crate::router::{RouteBuilder, RouteInfo, RouteMatch, Router, method_routes};
use crate::RequestContext;
use arc_swap::ArcSwap;
use bytes::Bytes;
use http::header::ALLOW;
use http::{HeaderValue, Method, Request, Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

pub struct App {
    router: ArcSwap<Router>,
    middlewares: Vec<Arc<dyn Middleware>>,
    cache: RouteCache,
    config: AppConfig,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Creates an app with an LRU lookup cache sized by `config.cache_capacity`.
    pub fn with_config(config: AppConfig) -> Self {
        let cache = LruLookupCache::new(config.cache_capacity);
        Self::with_lookup_cache(config, cache)
    }

    /// Creates an app backed by a custom lookup cache. `config.cache_capacity` is not used.
    pub fn with_lookup_cache(config: AppConfig, cache: impl LookupCache + 'static) -> Self {
        let cache = RouteCache::new(Box::new(cache), config.cache_enabled, config.cache_dynamic_routes);
        Self { router: ArcSwap::from_pointee(Router::new()), middlewares: Vec::new(), cache, config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registers `builder` for `method` at `pattern`. See [`Router::route`].
    pub fn route(&mut self, method: Method, pattern: &str, builder: RouteBuilder) -> Result<&mut Self, RouteError> {
        let mut router = self.router.swap(Arc::default());
        let registered = Arc::make_mut(&mut router).route(method, pattern, builder).map(|_| ());
        self.router.store(router);
        registered?;

        self.cache.invalidate();
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

    /// Appends a global middleware. Global middleware runs outside route middleware, in
    /// registration order.
    pub fn with_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        debug!(name = middleware.name(), "global middleware registered");
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Dispatches `request` through the pipeline of the route it resolves to.
    ///
    /// Requests that match no route get a `404 Not Found` (or `405` when enabled in the config)
    /// without any middleware being invoked. Errors raised by middleware or handlers are returned
    /// as is.
    pub async fn handle(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>, HandlerError> {
        self.dispatch(request, None).await
    }

    /// Like [`App::handle`], but gives up with [`Cancelled`] as soon as `token` is cancelled.
    ///
    /// The token is also stored in the context's extensions, so handlers can observe it.
    pub async fn handle_with_cancellation(
        &self,
        request: Request<Bytes>,
        token: CancellationToken,
    ) -> Result<Response<ResponseBody>, HandlerError> {
        let method = request.method().clone();
        let path = request_path(request.uri()).to_owned();

        tokio::select! {
            biased;

            () = token.cancelled() => {
                debug!(method = %method, path, "request cancelled");
                Err(Cancelled.into())
            }
            result = self.dispatch(request, Some(token.clone())) => result,
        }
    }

    async fn dispatch(
        &self,
        request: Request<Bytes>,
        token: Option<CancellationToken>,
    ) -> Result<Response<ResponseBody>, HandlerError> {
        let Some(found) = self.resolve(request.method(), request_path(request.uri())) else {
            return self.no_route(request.method(), request_path(request.uri()));
        };

        let (route, params) = found.into_parts();
        let mut ctx = RequestContext::new(request, params);
        if let Some(token) = token {
            ctx.extensions_mut().insert(token);
        }

        let next = Next::new(&self.middlewares, route.middlewares(), route.handler());
        let response = next.run(&mut ctx).await?;

        Ok(response.unwrap_or_else(|| ctx.into_response()))
    }

    /// Cache-aware resolution of an already normalized path.
    fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        if !self.cache.is_enabled() {
            return self.router.load().at(method, path);
        }

        // read the generation before the router, a concurrent reload then makes the entry stale
        let generation = self.cache.generation();
        let key = cache_key(method, path);
        if let Some(cached) = self.cache.get(&key, generation) {
            return cached;
        }

        let lookup = self.router.load().at(method, path);
        self.cache.put(key, generation, lookup.as_ref());
        lookup
    }

    fn no_route(&self, method: &Method, path: &str) -> Result<Response<ResponseBody>, HandlerError> {
        if self.config.method_not_allowed {
            let allowed = self.router.load().allowed_methods(path);
            if !allowed.is_empty() {
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                trace!(method = %method, path, allow, "method not allowed");

                let mut response = text_response("Method Not Allowed".into());
                *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
                response.headers_mut().insert(ALLOW, HeaderValue::from_str(&allow)?);
                return Ok(response);
            }
        }

        trace!(method = %method, path, "not found");
        let mut response = text_response("Not Found".into());
        *response.status_mut() = StatusCode::NOT_FOUND;
        Ok(response)
    }

    /// Resolves a raw URL (absolute or origin-form, query and fragment allowed) without
    /// dispatching.
    pub fn lookup(&self, method: &Method, url: &str) -> Option<RouteMatch> {
        self.resolve(method, normalize_path(url))
    }

    /// Registered routes sorted by path, then method.
    pub fn list_routes(&self) -> Vec<RouteInfo> {
        self.router.load().routes()
    }

    /// A snapshot of the current route table.
    pub fn router(&self) -> Arc<Router> {
        self.router.load_full()
    }

    /// Replaces the whole route table. Requests already dispatching keep the table they
    /// resolved against.
    pub fn reload(&self, router: Router) {
        let routes = router.len();
        self.router.store(Arc::new(router));
        self.cache.invalidate();
        info!(routes, "route table reloaded");
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate();
        debug!("lookup cache cleared");
    }

    /// Turns lookup caching on or off. Either way the cache is emptied.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache.set_enabled(enabled);
        debug!(enabled, "lookup cache toggled");
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Number of lookups currently cached, hits and misses alike.
    pub fn cached_lookups(&self) -> usize {
        self.cache.len()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.router.load().len())
            .field("middlewares", &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
