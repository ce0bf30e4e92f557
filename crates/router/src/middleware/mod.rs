//! Composable pipeline stages that run around the route handler.
//!
//! A middleware receives the [`RequestContext`] and the [`Next`] continuation. It may run code
//! before calling `next.run(ctx)`, run more code after it resolves, or return its own response
//! without calling it at all. Global middleware is registered on the [`App`](crate::App), route
//! middleware on a single route; for one request they form a single nested call stack:
//!
//! ```text
//! global[0] -> global[1] -> ... -> route[0] -> ... -> handler
//! ```

mod next;

pub use next::Next;

use crate::RequestContext;
use crate::handler::HandlerResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::borrow::Cow;
use std::fmt;

#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name reported by route introspection.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult;
}

/// A middleware that wraps a closure.
pub struct MiddlewareFn<F> {
    name: Cow<'static, str>,
    f: F,
}

/// Creates a named middleware from a closure.
///
/// ```
/// use futures::FutureExt;
/// use micro_router::middleware::middleware_fn;
///
/// let timing = middleware_fn("timing", |ctx, next| {
///     async move {
///         let start = std::time::Instant::now();
///         let result = next.run(ctx).await;
///         tracing::info!(elapsed = ?start.elapsed(), "request finished");
///         result
///     }
///     .boxed()
/// });
/// # let _ = timing;
/// ```
pub fn middleware_fn<F>(name: impl Into<Cow<'static, str>>, f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    MiddlewareFn { name: name.into(), f }
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
        (self.f)(ctx, next).await
    }
}

impl<F> fmt::Debug for MiddlewareFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareFn").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{Middleware, Next, middleware_fn};
    use crate::handler::{HandlerError, HandlerResult, RequestHandler, handler_fn};
    use crate::{PathParams, RequestContext};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::FutureExt;
    use http::{Request, Response, StatusCode};
    use std::io;
    use std::sync::{Arc, Mutex};

    type Trace = Arc<Mutex<Vec<String>>>;

    /// Records entry and exit, optionally refusing to call `next`.
    struct Recorder {
        name: &'static str,
        trace: Trace,
        short_circuit: bool,
    }

    impl Recorder {
        fn new(name: &'static str, trace: &Trace) -> Arc<dyn Middleware> {
            Arc::new(Self { name, trace: Arc::clone(trace), short_circuit: false })
        }

        fn short_circuit(name: &'static str, trace: &Trace) -> Arc<dyn Middleware> {
            Arc::new(Self { name, trace: Arc::clone(trace), short_circuit: true })
        }

        fn record(&self, event: &str) {
            self.trace.lock().unwrap().push(format!("{}-{event}", self.name));
        }
    }

    #[async_trait]
    impl Middleware for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
            self.record("before");
            if self.short_circuit {
                let response = Response::builder().status(StatusCode::FORBIDDEN).body("denied".into())?;
                return Ok(Some(response));
            }
            let response = next.run(ctx).await?;
            self.record("after");
            Ok(response)
        }
    }

    fn recording_handler(trace: &Trace) -> impl RequestHandler + use<> {
        let trace = Arc::clone(trace);
        handler_fn(move |_ctx| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().unwrap().push("H".to_string());
                Ok("done")
            }
            .boxed()
        })
    }

    fn context() -> RequestContext {
        RequestContext::new(Request::builder().uri("/").body(Bytes::new()).unwrap(), PathParams::empty())
    }

    fn events(trace: &Trace) -> Vec<String> {
        trace.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_onion_order() {
        let trace = Trace::default();
        let global = vec![Recorder::new("A", &trace), Recorder::new("B", &trace)];
        let route = vec![Recorder::new("C", &trace)];
        let handler = recording_handler(&trace);

        let response = Next::new(&global, &route, &handler).run(&mut context()).await.unwrap().unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            events(&trace),
            vec!["A-before", "B-before", "C-before", "H", "C-after", "B-after", "A-after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_stages() {
        let trace = Trace::default();
        let global = vec![Recorder::new("A", &trace), Recorder::new("B", &trace)];
        let route = vec![Recorder::short_circuit("C", &trace), Recorder::new("D", &trace)];
        let handler = recording_handler(&trace);

        let response = Next::new(&global, &route, &handler).run(&mut context()).await.unwrap().unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(events(&trace), vec!["A-before", "B-before", "C-before", "B-after", "A-after"]);
    }

    #[tokio::test]
    async fn test_error_skips_after_code() {
        let trace = Trace::default();
        let global = vec![Recorder::new("A", &trace)];
        let failing = handler_fn(|_ctx| async { Err::<(), HandlerError>(io::Error::other("broken").into()) }.boxed());

        let err = Next::new(&global, &[], &failing).run(&mut context()).await.unwrap_err();

        assert_eq!(err.to_string(), "broken");
        assert_eq!(events(&trace), vec!["A-before"]);
    }

    #[tokio::test]
    async fn test_middleware_fn() {
        let tagging = middleware_fn("tagging", |ctx, next| {
            async move {
                ctx.extensions_mut().insert("tagged");
                let result = next.run(ctx).await?;
                ctx.insert_header(http::header::SERVER, http::HeaderValue::from_static("micro-router"));
                Ok(result)
            }
            .boxed()
        });
        assert_eq!(tagging.name(), "tagging");

        let route: Vec<Arc<dyn Middleware>> = vec![Arc::new(tagging)];
        let handler = handler_fn(|ctx| {
            async move {
                assert_eq!(ctx.extensions().get::<&'static str>(), Some(&"tagged"));
                Ok(())
            }
            .boxed()
        });

        let mut ctx = context();
        let response = Next::new(&[], &route, &handler).run(&mut ctx).await.unwrap();

        assert!(response.is_none());
        assert_eq!(ctx.response().headers()[http::header::SERVER], "micro-router");
    }

    #[test]
    fn test_default_name() {
        struct Anonymous;

        #[async_trait]
        impl Middleware for Anonymous {
            async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
                next.run(ctx).await
            }
        }

        assert!(Anonymous.name().ends_with("Anonymous"));
    }
}
