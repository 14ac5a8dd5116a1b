//! Path-based routing with an onion-ordered filter chain.

mod error;
mod path_spec;
mod routed;
mod context;
mod handler;
mod filter;
#[allow(clippy::module_inception)]
mod router;

pub use error::Error;
pub use path_spec::{PathParams, PathSpec};
pub use routed::{MethodMatch, RoutedFilter, RoutedHandler};
pub use context::{RequestContext, PATH_PARAMS};
pub use handler::{offload, Handler, HandlerFuture};
pub use filter::{after, before, After, Before, Filter, Next};
pub use router::{Router, NOT_FOUND_BODY};
