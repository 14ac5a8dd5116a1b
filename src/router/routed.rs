//! Handlers and filters bound to a method and path.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::parser::Method;
use crate::router::filter::Filter;
use crate::router::handler::Handler;
use crate::router::path_spec::{PathParams, PathSpec};

/// The methods a route or filter answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodMatch {
    Only(Method),
    Any,
}

impl MethodMatch {
    pub fn matches(&self, method: Method) -> bool {
        match self {
            MethodMatch::Only(expected) => *expected == method,
            MethodMatch::Any => true,
        }
    }
}

impl From<Method> for MethodMatch {
    fn from(method: Method) -> Self {
        MethodMatch::Only(method)
    }
}

impl fmt::Display for MethodMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodMatch::Only(method) => write!(f, "{method}"),
            MethodMatch::Any => f.write_str("ANY"),
        }
    }
}

/// A handler registered for a method and path template.
pub struct RoutedHandler {
    method: MethodMatch,
    spec: PathSpec,
    handler: Arc<dyn Handler>,
}

impl RoutedHandler {
    pub fn new(method: MethodMatch, spec: PathSpec, handler: Arc<dyn Handler>) -> Self {
        Self {
            method,
            spec,
            handler,
        }
    }

    pub fn method(&self) -> MethodMatch {
        self.method
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn matches(&self, method: Method, path: &str) -> Option<PathParams> {
        if self.method.matches(method) {
            self.spec.matches(path)
        } else {
            None
        }
    }
}

// Ordered by template, then method, for stable route listings.
impl PartialEq for RoutedHandler {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RoutedHandler {}

impl PartialOrd for RoutedHandler {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RoutedHandler {
    fn cmp(&self, other: &Self) -> Ordering {
        self.spec
            .template()
            .cmp(other.spec.template())
            .then(self.method.cmp(&other.method))
    }
}

impl fmt::Display for RoutedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.spec)
    }
}

impl fmt::Debug for RoutedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedHandler")
            .field("method", &self.method)
            .field("template", &self.spec.template())
            .finish()
    }
}

/// A filter registered for a method and path template.
pub struct RoutedFilter {
    method: MethodMatch,
    spec: PathSpec,
    filter: Arc<dyn Filter>,
}

impl RoutedFilter {
    pub fn new(method: MethodMatch, spec: PathSpec, filter: Arc<dyn Filter>) -> Self {
        Self {
            method,
            spec,
            filter,
        }
    }

    pub fn method(&self) -> MethodMatch {
        self.method
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    pub fn applies_to(&self, method: Method, path: &str) -> bool {
        self.method.matches(method) && self.spec.matches(path).is_some()
    }
}

impl fmt::Display for RoutedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.spec)
    }
}

impl fmt::Debug for RoutedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedFilter")
            .field("method", &self.method)
            .field("template", &self.spec.template())
            .finish()
    }
}
