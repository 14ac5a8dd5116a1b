//! Tokens passed from the tokenizer to the parser.

use serde_json::Value;

/// What a token is.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    /// A key inside an object. Always followed by the key's value.
    FieldName(String),
    /// A complete string, number, boolean or null.
    Scalar(Value),
}

/// A complete token and where it started in the body.
///
/// Tokens are never split: bytes of a token that straddles a chunk
/// boundary stay in the tokenizer until the rest arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseToken {
    pub kind: TokenKind,
    /// Byte offset of the token's first byte from the start of the body.
    pub offset: u64,
}

impl ParseToken {
    pub fn new(kind: TokenKind, offset: u64) -> Self {
        Self { kind, offset }
    }
}
