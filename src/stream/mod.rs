//! Incremental body decoding.
//!
//! A body arrives as chunks whose boundaries have nothing to do with the
//! syntax inside it. The [`Tokenizer`] turns those chunks into whole
//! [`ParseToken`]s, carrying partial tokens over between chunks, and the
//! [`ValueParser`] folds tokens into values. [`DecodeStream`] wires the two
//! to a [`BodyStream`](crate::body::BodyStream) under pull-based demand.

mod token;
mod tokenizer;
mod parser;
mod decode;
mod tests;

pub use token::{ParseToken, TokenKind};
pub use tokenizer::{JsonTokenizer, Tokenizer, DEFAULT_MAX_TOKEN_LEN};
pub use parser::{ReadMode, TokenParser, ValueParser};
pub use decode::DecodeStream;
