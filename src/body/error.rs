//! Error types for body reading and writing.

use thiserror::Error;

/// Errors raised while selecting a codec or converting a body.
#[derive(Debug, Error)]
pub enum Error {
    /// No registered reader or writer applies to the type and media type.
    #[error("No body codec for {type_name} with media type '{media_type}'")]
    UnsupportedType {
        type_name: String,
        media_type: String,
    },

    /// The body is not valid for the codec that reads it.
    #[error("Malformed body at byte {offset}: {reason}")]
    MalformedBody { offset: u64, reason: String },

    /// The body ended in the middle of a value.
    #[error("Body ended before a complete value was read")]
    PrematureEnd,

    /// The request body stream was already taken by an earlier read.
    #[error("Request body was already consumed")]
    BodyConsumed,

    /// A single token grew past the tokenizer's carry-over limit.
    #[error("Body token exceeds {0} bytes")]
    TokenTooLarge(usize),

    /// A text body is not valid UTF-8.
    #[error("Text body is not valid UTF-8")]
    InvalidUtf8,

    /// The transport failed to deliver the body.
    #[error("Body transport error: {0}")]
    Transport(String),

    /// A value in a streamed response failed to materialize.
    #[error("Entity error: {0}")]
    Entity(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON value could not be mapped onto the target type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A response value could not be serialized.
    #[error("Could not encode response body: {0}")]
    Encode(serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Error::MalformedBody {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the client's payload rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedBody { .. }
                | Error::PrematureEnd
                | Error::TokenTooLarge(_)
                | Error::InvalidUtf8
                | Error::Json(_)
        )
    }
}
