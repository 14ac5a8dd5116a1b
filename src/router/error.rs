//! Error types for routing and dispatch.

use thiserror::Error;

use crate::body::Error as BodyError;
use crate::server::StatusCode;

/// Errors raised while registering routes or running the filter chain.
#[derive(Debug, Error)]
pub enum Error {
    /// A path template could not be compiled. Fatal at startup.
    #[error("Invalid path template '{template}': {reason}")]
    Pattern { template: String, reason: String },

    /// A handler or filter failed.
    #[error("Handler error: {0}")]
    Handler(String),

    /// Reading or writing a body failed.
    #[error(transparent)]
    Body(#[from] BodyError),
}

impl Error {
    pub(crate) fn pattern(template: &str, reason: impl Into<String>) -> Self {
        Error::Pattern {
            template: template.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for handler code.
    pub fn handler(message: impl Into<String>) -> Self {
        Error::Handler(message.into())
    }

    /// The status a response for this error should carry.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Body(BodyError::UnsupportedType { .. }) => StatusCode::UnsupportedMediaType,
            Error::Body(err) if err.is_client_error() => StatusCode::BadRequest,
            _ => StatusCode::InternalServerError,
        }
    }
}
