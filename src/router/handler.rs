//! Request handlers.

use std::future::Future;

use futures::future::BoxFuture;

use crate::router::context::RequestContext;
use crate::router::error::Error;

/// Type alias for the boxed future a handler returns.
pub type HandlerFuture = BoxFuture<'static, Result<RequestContext, Error>>;

/// Produces the response for a matched route.
///
/// A handler takes ownership of the context and hands it back with a
/// response set. Any `Fn(RequestContext) -> impl Future` closure is a
/// handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RequestContext, Error>> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        Box::pin(self(ctx))
    }
}

/// Run blocking or CPU-heavy work on the blocking worker pool so it does
/// not stall the connection's I/O thread.
pub async fn offload<F, R>(work: F) -> Result<R, Error>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| Error::Handler(format!("worker task failed: {err}")))
}
