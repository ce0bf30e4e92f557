//! A trie based HTTP router with an asynchronous middleware pipeline.
//!
//! The crate resolves `(method, path)` pairs to handlers and runs every request through global
//! middleware, route middleware and finally the handler. It works on [`http::Request`] and
//! [`http::Response`] values and leaves the transport to the caller.
//!
//! ```
//! use bytes::Bytes;
//! use futures::FutureExt;
//! use http::{Request, StatusCode};
//! use micro_router::{App, Json, handler_fn, route};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut app = App::new();
//! app.get(
//!     "/users/:id",
//!     route().to(handler_fn(|ctx| {
//!         async move { Ok(Json(serde_json::json!({ "id": ctx.param("id") }))) }.boxed()
//!     })),
//! )
//! .unwrap();
//!
//! let request = Request::get("/users/42").body(Bytes::new()).unwrap();
//! let response = app.handle(request).await.unwrap();
//! assert_eq!(response.status(), StatusCode::OK);
//! # }
//! ```

mod app;
mod body;
mod config;
mod error;
mod handler;
mod request;
mod responder;

pub mod cache;
pub mod middleware;
pub mod router;

pub use app::App;
pub use body::ResponseBody;
pub use config::AppConfig;
pub use error::{Cancelled, ExtractError, RouteError};
pub use handler::{FnHandler, HandlerError, HandlerResult, RequestHandler, handler_fn};
pub use middleware::{Middleware, Next, middleware_fn};
pub use request::{PathParams, RequestContext, normalize_path};
pub use responder::{Json, NoContent, Responder};
pub use router::{Route, RouteBuilder, RouteInfo, RouteMatch, Router, route};

pub use tokio_util::sync::CancellationToken;
