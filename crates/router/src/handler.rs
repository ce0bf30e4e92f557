use crate::RequestContext;
use crate::body::ResponseBody;
use crate::responder::Responder;
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::Response;
use std::error::Error;
use std::fmt;

/// Error type flowing out of handlers and middleware. The pipeline never inspects it.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// The outcome of a pipeline stage.
///
/// `Ok(None)` means the stage produced no explicit response and the context's response draft
/// should be used.
pub type HandlerResult = Result<Option<Response<ResponseBody>>, HandlerError>;

/// The terminal stage of a route.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: &mut RequestContext) -> HandlerResult;
}

/// a closure holder which represents an async handler
pub struct FnHandler<F> {
    f: F,
}

/// Wraps a closure into a [`RequestHandler`].
///
/// The closure borrows the context for the lifetime of the returned future, which therefore
/// has to be boxed:
///
/// ```
/// use futures::FutureExt;
/// use micro_router::handler_fn;
///
/// let handler = handler_fn(|ctx| {
///     async move { Ok(format!("hello {}", ctx.param("name").unwrap_or("world"))) }.boxed()
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, R>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<R, HandlerError>> + Send + Sync,
    R: Responder,
{
    FnHandler { f }
}

#[async_trait]
impl<F, R> RequestHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<R, HandlerError>> + Send + Sync,
    R: Responder,
{
    async fn invoke(&self, ctx: &mut RequestContext) -> HandlerResult {
        let responder = (self.f)(ctx).await?;
        Ok(responder.respond_to(ctx))
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::handler::{HandlerError, RequestHandler, handler_fn};
    use crate::{PathParams, RequestContext};
    use bytes::Bytes;
    use futures::FutureExt;
    use http::{Request, StatusCode};
    use std::io;

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    fn context() -> RequestContext {
        RequestContext::new(Request::builder().uri("/").body(Bytes::new()).unwrap(), PathParams::empty())
    }

    #[test]
    fn assert_fn_is_request_handler() {
        let handler = handler_fn(|_ctx| async { Ok("hello") }.boxed());
        assert_is_handler(&handler);
    }

    #[tokio::test]
    async fn test_unit_return_keeps_draft() {
        let handler = handler_fn(|ctx| {
            async move {
                ctx.set_status(StatusCode::ACCEPTED);
                Ok(())
            }
            .boxed()
        });

        let mut ctx = context();
        let response = handler.invoke(&mut ctx).await.unwrap();

        assert!(response.is_none());
        assert_eq!(ctx.response().status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_error_is_returned_unmodified() {
        let handler = handler_fn(|_ctx| {
            async { Err::<(), HandlerError>(io::Error::other("boom").into()) }.boxed()
        });

        let err = handler.invoke(&mut context()).await.unwrap_err();

        let io_err = err.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.to_string(), "boom");
    }
}
