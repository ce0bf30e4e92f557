use http::Method;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Introspection record of one registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    #[serde(serialize_with = "serialize_method")]
    method: Method,
    path: String,
    middlewares: Vec<String>,
}

impl RouteInfo {
    pub(crate) fn new(method: Method, path: impl Into<String>, middlewares: Vec<String>) -> Self {
        Self { method, path: path.into(), middlewares }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Names of the route's own middleware, in the order they wrap the handler.
    pub fn middlewares(&self) -> &[String] {
        &self.middlewares
    }
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.middlewares.is_empty() {
            write!(f, " [{}]", self.middlewares.join(", "))?;
        }
        Ok(())
    }
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}

/// Flat table of registered routes, keyed by `(path, method)` so listing is sorted by path then method.
#[derive(Debug, Clone, Default)]
pub(crate) struct RouteRegistry {
    routes: BTreeMap<(String, String), RouteInfo>,
}

impl RouteRegistry {
    /// Records `info`, returning the entry it replaced.
    pub(crate) fn record(&mut self, info: RouteInfo) -> Option<RouteInfo> {
        let key = (info.path.clone(), info.method.as_str().to_owned());
        self.routes.insert(key, info)
    }

    pub(crate) fn remove(&mut self, method: &Method, path: &str) -> Option<RouteInfo> {
        self.routes.remove(&(path.to_owned(), method.as_str().to_owned()))
    }

    pub(crate) fn list(&self) -> Vec<RouteInfo> {
        self.routes.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }
}
