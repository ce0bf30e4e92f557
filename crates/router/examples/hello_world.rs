use bytes::Bytes;
use futures::FutureExt;
use http::{Method, Request};
use http_body_util::BodyExt;
use micro_router::{App, AppConfig, Json, NoContent, handler_fn, middleware_fn, route};
use serde::Deserialize;
use std::error::Error;
use std::time::Instant;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Debug)]
struct Search {
    q: String,
    #[serde(default)]
    page: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::TRACE).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut app = App::with_config(AppConfig::default().method_not_allowed(true));

    app.with_middleware(middleware_fn("timing", |ctx, next| {
        async move {
            let start = Instant::now();
            let result = next.run(ctx).await;
            info!(method = %ctx.method(), path = ctx.path(), elapsed = ?start.elapsed(), "request finished");
            result
        }
        .boxed()
    }));

    app.get("/", route().to(handler_fn(|_ctx| async { Ok("hello world") }.boxed())))?
        .get(
            "/users/:id",
            route().to(handler_fn(|ctx| {
                async move { Ok(Json(serde_json::json!({ "id": ctx.param("id") }))) }.boxed()
            })),
        )?
        .delete("/users/:id", route().to(handler_fn(|_ctx| async { Ok(NoContent) }.boxed())))?
        .get(
            "/files/*",
            route().to(handler_fn(|ctx| {
                async move { Ok(format!("file: {}", ctx.param("*").unwrap_or_default())) }.boxed()
            })),
        )?
        .get(
            "/search",
            route().to(handler_fn(|ctx| {
                async move {
                    let search = ctx.query_as::<Search>()?;
                    Ok(format!("searching '{}' page {}", search.q, search.page))
                }
                .boxed()
            })),
        )?;

    for route in app.list_routes() {
        info!("{route}");
    }

    let requests = [
        (Method::GET, "/"),
        (Method::GET, "/users/42"),
        (Method::DELETE, "/users/42"),
        (Method::PUT, "/users/42"),
        (Method::GET, "/files/docs/read%20me.txt"),
        (Method::GET, "/search?q=router&page=2"),
        (Method::GET, "/nonexistent"),
    ];

    for (method, uri) in requests {
        let request = Request::builder().method(method.clone()).uri(uri).body(Bytes::new())?;
        let response = app.handle(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        println!("{method} {uri} -> {status} {}", String::from_utf8_lossy(&body));
    }

    Ok(())
}
