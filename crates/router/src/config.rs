use crate::cache::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};

/// Settings of an [`App`](crate::App).
///
/// Every field has a default, so a partial document deserializes:
///
/// ```
/// use micro_router::AppConfig;
///
/// let config: AppConfig = serde_json::from_str(r#"{ "cache_capacity": 64 }"#).unwrap();
/// assert_eq!(config.cache_capacity, 64);
/// assert!(config.cache_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Memoize route lookups.
    pub cache_enabled: bool,

    /// Upper bound of cached lookups.
    pub cache_capacity: usize,

    /// Also cache lookups that captured path parameters. Their key space is unbounded, so
    /// turning this off keeps the cache for static paths.
    pub cache_dynamic_routes: bool,

    /// Answer `405 Method Not Allowed` with an `Allow` header when the path matches a route
    /// registered for other methods. When off, such requests get the plain 404.
    pub method_not_allowed: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_capacity: DEFAULT_CAPACITY,
            cache_dynamic_routes: true,
            method_not_allowed: false,
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn cache_dynamic_routes(mut self, enabled: bool) -> Self {
        self.cache_dynamic_routes = enabled;
        self
    }

    #[must_use]
    pub fn method_not_allowed(mut self, enabled: bool) -> Self {
        self.method_not_allowed = enabled;
        self
    }
}
