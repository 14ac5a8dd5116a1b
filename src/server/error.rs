//! Error types for the HTTP server.

use thiserror::Error;

use crate::body::Error as BodyError;
use crate::parser::Error as ParserError;
use crate::router::Error as RouterError;

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The peer closed the connection in the middle of a request.
    #[error("Connection closed mid-request")]
    UnexpectedEof,

    /// A route or filter failed and no filter turned it into a response.
    #[error("Router error: {0}")]
    RouterError(#[from] RouterError),

    /// A streamed response body failed after the head was sent.
    #[error("Body error: {0}")]
    BodyError(#[from] BodyError),
}
