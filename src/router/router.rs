//! Route table and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use log::debug;

use crate::parser::Method;
use crate::router::context::{RequestContext, PATH_PARAMS};
use crate::router::error::Error;
use crate::router::filter::{Filter, Next};
use crate::router::handler::Handler;
use crate::router::path_spec::{PathParams, PathSpec};
use crate::router::routed::{MethodMatch, RoutedFilter, RoutedHandler};
use crate::server::{HttpResponse, StatusCode};

/// Body of the built-in not-found response.
pub const NOT_FOUND_BODY: &str = "Not Found";

/// Matches requests to handlers and runs them inside the filter chain.
///
/// Resolution checks the routes registered for the request's method
/// first, then the routes registered for any method. Within each list the
/// first registered route whose template matches wins; templates are not
/// ranked by specificity. When nothing matches, a built-in `ANY /*` route
/// answers 404.
pub struct Router {
    filters: Vec<RoutedFilter>,
    routes: HashMap<Method, Vec<RoutedHandler>>,
    any_routes: Vec<RoutedHandler>,
    not_found: RoutedHandler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            routes: HashMap::new(),
            any_routes: Vec::new(),
            not_found: RoutedHandler::new(MethodMatch::Any, PathSpec::any(), Arc::new(not_found)),
        }
    }

    /// Register `handler` for `method` and `template`.
    pub fn route<H: Handler>(&mut self, method: impl Into<MethodMatch>, template: &str, handler: H) -> Result<&mut Self, Error> {
        let method = method.into();
        let routed = RoutedHandler::new(method, PathSpec::compile(template)?, Arc::new(handler));
        match method {
            MethodMatch::Only(method) => self.routes.entry(method).or_default().push(routed),
            MethodMatch::Any => self.any_routes.push(routed),
        }
        Ok(self)
    }

    pub fn get<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, Error> {
        self.route(Method::GET, template, handler)
    }

    pub fn post<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, Error> {
        self.route(Method::POST, template, handler)
    }

    pub fn put<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, Error> {
        self.route(Method::PUT, template, handler)
    }

    pub fn delete<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, Error> {
        self.route(Method::DELETE, template, handler)
    }

    pub fn patch<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, Error> {
        self.route(Method::PATCH, template, handler)
    }

    pub fn head<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, Error> {
        self.route(Method::HEAD, template, handler)
    }

    pub fn options<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, Error> {
        self.route(Method::OPTIONS, template, handler)
    }

    /// Register `handler` for every method.
    pub fn any<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, Error> {
        self.route(MethodMatch::Any, template, handler)
    }

    /// Add a filter that runs for every request.
    pub fn add_filter<F: Filter>(&mut self, filter: F) -> &mut Self {
        self.filters
            .push(RoutedFilter::new(MethodMatch::Any, PathSpec::any(), Arc::new(filter)));
        self
    }

    /// Add a filter that runs for requests whose path matches `template`.
    pub fn add_filter_at<F: Filter>(&mut self, template: &str, filter: F) -> Result<&mut Self, Error> {
        self.add_method_filter(MethodMatch::Any, template, filter)
    }

    /// Add a filter restricted to `method` and `template`.
    pub fn add_method_filter<F: Filter>(&mut self, method: impl Into<MethodMatch>, template: &str, filter: F) -> Result<&mut Self, Error> {
        let spec = PathSpec::compile(template)?;
        self.filters
            .push(RoutedFilter::new(method.into(), spec, Arc::new(filter)));
        Ok(self)
    }

    /// Resolve the route for `method` and `path` without running it.
    pub fn find(&self, method: Method, path: &str) -> Option<(&RoutedHandler, PathParams)> {
        let exact = self.routes.get(&method).map(Vec::as_slice).unwrap_or_default();
        exact
            .iter()
            .chain(self.any_routes.iter())
            .find_map(|route| route.matches(method, path).map(|params| (route, params)))
    }

    /// All registered routes, ordered by template then method.
    pub fn routes(&self) -> Vec<&RoutedHandler> {
        let mut routes: Vec<&RoutedHandler> = self
            .routes
            .values()
            .flatten()
            .chain(self.any_routes.iter())
            .collect();
        routes.sort();
        routes
    }

    pub fn filters(&self) -> &[RoutedFilter] {
        &self.filters
    }

    /// Run the filter chain and the matched handler for `ctx`.
    ///
    /// The matched route's path parameters are stored under
    /// [`PATH_PARAMS`] before the first filter runs.
    pub fn dispatch<'a>(&'a self, mut ctx: RequestContext) -> BoxFuture<'a, Result<RequestContext, Error>> {
        let method = ctx.request().method;
        let endpoint = match self.find(method, ctx.path()) {
            Some((route, params)) => {
                debug!("{method} {} matched {route}", ctx.path());
                ctx.set_attribute(PATH_PARAMS, params);
                route
            }
            None => {
                debug!("No route for {method} {}", ctx.path());
                &self.not_found
            }
        };
        Next::new(&self.filters, endpoint).run(ctx)
    }
}

async fn not_found(ctx: RequestContext) -> Result<RequestContext, Error> {
    let response = HttpResponse::new(StatusCode::NotFound)
        .with_content_type("text/plain")
        .with_body_string(NOT_FOUND_BODY);
    Ok(ctx.respond(response))
}
