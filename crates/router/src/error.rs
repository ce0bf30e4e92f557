use http::Method;
use thiserror::Error;

/// Errors raised while registering a route.
///
/// Registration is fail-fast: when one of these is returned the route table is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("route '{method} {pattern}' has no handler")]
    MissingHandler { method: Method, pattern: String },

    #[error("unsupported method {method} for route '{pattern}'")]
    UnsupportedMethod { method: Method, pattern: String },

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route '{pattern}' names parameter ':{name}' but ':{existing}' is already registered at the same position")]
    ConflictingParam { pattern: String, name: String, existing: String },
}

impl RouteError {
    pub fn missing_handler<S: ToString>(method: Method, pattern: S) -> Self {
        Self::MissingHandler { method, pattern: pattern.to_string() }
    }

    pub fn unsupported_method<S: ToString>(method: Method, pattern: S) -> Self {
        Self::UnsupportedMethod { method, pattern: pattern.to_string() }
    }

    pub fn invalid_pattern<P: ToString, S: ToString>(pattern: P, reason: S) -> Self {
        Self::InvalidPattern { pattern: pattern.to_string(), reason: reason.to_string() }
    }

    pub fn conflicting_param<P: ToString>(pattern: P, name: &str, existing: &str) -> Self {
        Self::ConflictingParam { pattern: pattern.to_string(), name: name.to_owned(), existing: existing.to_owned() }
    }
}

/// Errors produced when a handler decodes the request body or query string.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("has no query string")]
    MissingQuery,

    #[error("invalid query string: {reason}")]
    InvalidQuery { reason: String },

    #[error("invalid json body: {source}")]
    InvalidJson {
        #[from]
        source: serde_json::Error,
    },
}

impl ExtractError {
    pub fn invalid_query<S: ToString>(str: S) -> Self {
        Self::InvalidQuery { reason: str.to_string() }
    }
}

/// Returned by [`App::handle_with_cancellation`](crate::App::handle_with_cancellation) when the
/// token fires before the pipeline produced a response.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("request cancelled before a response was produced")]
pub struct Cancelled;
