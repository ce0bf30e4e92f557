use crate::RequestContext;
use crate::handler::{HandlerResult, RequestHandler};
use crate::middleware::Middleware;
use std::fmt;
use std::sync::Arc;

/// The continuation handed to a [`Middleware`]: everything inward of the current stage.
///
/// `Next` is consumed by [`Next::run`], so a middleware can proceed inward at most once.
/// Dropping it without running short-circuits the rest of the chain, including the handler.
pub struct Next<'a> {
    global: &'a [Arc<dyn Middleware>],
    route: &'a [Arc<dyn Middleware>],
    handler: &'a dyn RequestHandler,
}

impl<'a> Next<'a> {
    /// Builds the outermost continuation for one request.
    ///
    /// Global middleware wraps route middleware, which wraps the handler.
    pub fn new(
        global: &'a [Arc<dyn Middleware>],
        route: &'a [Arc<dyn Middleware>],
        handler: &'a dyn RequestHandler,
    ) -> Self {
        Self { global, route, handler }
    }

    /// Runs the next stage and everything inward of it.
    ///
    /// Errors are returned as produced; no stage of the chain is retried or recovered.
    pub async fn run(self, ctx: &mut RequestContext) -> HandlerResult {
        if let Some((current, global)) = self.global.split_first() {
            let next = Next { global, ..self };
            return current.handle(ctx, next).await;
        }

        if let Some((current, route)) = self.route.split_first() {
            let next = Next { route, ..self };
            return current.handle(ctx, next).await;
        }

        self.handler.invoke(ctx).await
    }

    /// Number of middleware stages left before the handler.
    pub fn remaining(&self) -> usize {
        self.global.len() + self.route.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("remaining", &self.remaining()).finish_non_exhaustive()
    }
}
