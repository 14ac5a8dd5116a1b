//! HTTP parser module.
//!
//! Parses request heads incrementally from a growing buffer and decodes
//! chunked body framing without buffering the body itself.

mod request;
mod method;
mod version;
mod error;
mod chunked;
mod tests;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;
pub use chunked::{ChunkedDecoder, ChunkedEvent};

pub use request::parse_request_head;
