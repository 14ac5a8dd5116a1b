//! A small server showing routing, filters and streamed JSON bodies.
//!
//! Try it with:
//!
//! ```text
//! curl localhost:8080/hello/you
//! curl -X POST localhost:8080/points/sum -d '[{"x":1,"y":2},{"x":3,"y":4}]'
//! curl localhost:8080/points?count=5
//! ```

use futures::stream::{self, TryStreamExt};
use log::info;
use serde::{Deserialize, Serialize};

use microhttp_flow::router::{after, before};
use microhttp_flow::{
    BodyError, Entity, HttpResponse, RequestContext, Router, RouterError, HttpServer, ServerConfig, StatusCode,
};

#[derive(Debug, Serialize, Deserialize)]
struct Point {
    x: i64,
    y: i64,
}

async fn hello(ctx: RequestContext) -> Result<RequestContext, RouterError> {
    let name = ctx.path_param("name").unwrap_or("World").to_string();
    let response = HttpResponse::new(StatusCode::Ok)
        .with_content_type("text/plain")
        .with_body_string(format!("Hello, {name}!"));
    Ok(ctx.respond(response))
}

/// Sums points as they arrive, without holding the whole array in memory.
async fn sum_points(mut ctx: RequestContext) -> Result<RequestContext, RouterError> {
    let points = ctx.read_stream::<Point>()?;
    let total = points
        .try_fold(Point { x: 0, y: 0 }, |acc, p| async move {
            Ok::<_, BodyError>(Point {
                x: acc.x + p.x,
                y: acc.y + p.y,
            })
        })
        .await?;
    ctx.respond_with(StatusCode::Ok, Entity::value(total)).await
}

/// Streams generated points back as one JSON array.
async fn list_points(ctx: RequestContext) -> Result<RequestContext, RouterError> {
    let count: i64 = ctx
        .request()
        .get_query_param("count")
        .and_then(|count| count.parse().ok())
        .unwrap_or(3);
    let points = stream::iter((0..count).map(|i| Ok::<_, BodyError>(Point { x: i, y: i * i })));
    ctx.respond_with(StatusCode::Ok, Entity::stream(points)).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut router = Router::new();
    router
        .add_filter(before(|ctx: &mut RequestContext| {
            info!("{} {}", ctx.request().method, ctx.request().path);
            None
        }))
        .add_filter(after(|ctx: &mut RequestContext| {
            if let Some(response) = ctx.response_mut() {
                response.set_header("X-Powered-By", "microhttp-flow");
            }
        }))
        .get("/hello/{name}", hello)?
        .post("/points/sum", sum_points)?
        .get("/points", list_points)?;

    let server = HttpServer::new(ServerConfig::default(), router);
    server.start().await?;

    Ok(())
}
