//! Filters and the cursor that walks the filter chain.

use futures::future::{self, BoxFuture};
use log::trace;

use crate::router::context::RequestContext;
use crate::router::error::Error;
use crate::router::routed::{RoutedFilter, RoutedHandler};
use crate::server::HttpResponse;

/// Middleware wrapped around every matching request.
///
/// Code before `next.run(ctx)` runs in registration order; code composed
/// after it runs in reverse registration order. Returning without calling
/// `next` short-circuits the rest of the chain and the handler.
pub trait Filter: Send + Sync + 'static {
    fn filter<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Result<RequestContext, Error>>;
}

/// The remainder of the chain after the current filter.
///
/// Holds the unvisited filters and the endpoint, so a chain of any length
/// is walked by advancing a slice rather than nesting closures.
pub struct Next<'a> {
    filters: &'a [RoutedFilter],
    endpoint: &'a RoutedHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(filters: &'a [RoutedFilter], endpoint: &'a RoutedHandler) -> Self {
        Self { filters, endpoint }
    }

    /// Invoke the next applicable filter, or the handler when none is left.
    pub fn run(self, ctx: RequestContext) -> BoxFuture<'a, Result<RequestContext, Error>> {
        let mut rest = self.filters;
        while let Some((first, tail)) = rest.split_first() {
            if first.applies_to(ctx.request().method, ctx.path()) {
                trace!("Entering filter {first}");
                return first.filter().filter(ctx, Next::new(tail, self.endpoint));
            }
            rest = tail;
        }
        trace!("Invoking handler {}", self.endpoint);
        self.endpoint.handler().call(ctx)
    }
}

/// A filter that inspects the request before the rest of the chain.
pub struct Before<F>(F);

/// Build a filter from a closure run before the rest of the chain.
/// Returning a response short-circuits.
pub fn before<F>(check: F) -> Before<F>
where
    F: Fn(&mut RequestContext) -> Option<HttpResponse> + Send + Sync + 'static,
{
    Before(check)
}

impl<F> Filter for Before<F>
where
    F: Fn(&mut RequestContext) -> Option<HttpResponse> + Send + Sync + 'static,
{
    fn filter<'a>(&'a self, mut ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Result<RequestContext, Error>> {
        match (self.0)(&mut ctx) {
            Some(response) => Box::pin(future::ready(Ok(ctx.respond(response)))),
            None => next.run(ctx),
        }
    }
}

/// A filter that adjusts the context once the rest of the chain finished.
pub struct After<F>(F);

/// Build a filter from a closure run after the rest of the chain succeeded.
pub fn after<F>(finish: F) -> After<F>
where
    F: Fn(&mut RequestContext) + Send + Sync + 'static,
{
    After(finish)
}

impl<F> Filter for After<F>
where
    F: Fn(&mut RequestContext) + Send + Sync + 'static,
{
    fn filter<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Result<RequestContext, Error>> {
        Box::pin(async move {
            let mut ctx = next.run(ctx).await?;
            (self.0)(&mut ctx);
            Ok(ctx)
        })
    }
}
