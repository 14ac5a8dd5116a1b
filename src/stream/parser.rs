//! Reduces a token sequence into completed values.

use serde_json::{Map, Value};

use crate::body::Error;
use crate::stream::token::{ParseToken, TokenKind};

/// Consumes tokens one at a time and hands back each value as soon as its
/// last token arrives.
pub trait ValueParser: Send {
    type Output;

    /// Feed one token. Returns a value when this token completed one.
    fn push(&mut self, token: ParseToken) -> Result<Option<Self::Output>, Error>;

    /// Input ended. Fails if a value was left half built.
    fn finish(&mut self) -> Result<(), Error>;
}

/// How root-level values map to emitted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Every root value is emitted whole.
    Values,
    /// A root array is unwrapped and each element emitted on its own.
    /// Root values that are not arrays are emitted whole.
    Elements,
}

#[derive(Debug)]
enum Frame {
    Object {
        map: Map<String, Value>,
        key: Option<String>,
    },
    Array(Vec<Value>),
}

/// Builds [`serde_json::Value`]s from JSON tokens.
#[derive(Debug)]
pub struct TokenParser {
    mode: ReadMode,
    stack: Vec<Frame>,
    in_root_array: bool,
}

impl TokenParser {
    pub fn new(mode: ReadMode) -> Self {
        Self {
            mode,
            stack: Vec::new(),
            in_root_array: false,
        }
    }

    fn complete(&mut self, value: Value, offset: u64) -> Result<Option<Value>, Error> {
        match self.stack.last_mut() {
            None => Ok(Some(value)),
            Some(Frame::Array(items)) => {
                items.push(value);
                Ok(None)
            }
            Some(Frame::Object { map, key }) => match key.take() {
                Some(key) => {
                    map.insert(key, value);
                    Ok(None)
                }
                None => Err(Error::malformed(offset, "object value without a field name")),
            },
        }
    }
}

impl ValueParser for TokenParser {
    type Output = Value;

    fn push(&mut self, token: ParseToken) -> Result<Option<Value>, Error> {
        let ParseToken { kind, offset } = token;
        match kind {
            TokenKind::StartArray
                if self.stack.is_empty() && self.mode == ReadMode::Elements && !self.in_root_array =>
            {
                self.in_root_array = true;
                Ok(None)
            }
            TokenKind::EndArray if self.stack.is_empty() => {
                if self.in_root_array {
                    self.in_root_array = false;
                    Ok(None)
                } else {
                    Err(Error::malformed(offset, "unbalanced ']'"))
                }
            }
            TokenKind::StartObject => {
                self.stack.push(Frame::Object {
                    map: Map::new(),
                    key: None,
                });
                Ok(None)
            }
            TokenKind::StartArray => {
                self.stack.push(Frame::Array(Vec::new()));
                Ok(None)
            }
            TokenKind::EndObject => match self.stack.pop() {
                Some(Frame::Object { map, key: None }) => self.complete(Value::Object(map), offset),
                _ => Err(Error::malformed(offset, "unbalanced '}'")),
            },
            TokenKind::EndArray => match self.stack.pop() {
                Some(Frame::Array(items)) => self.complete(Value::Array(items), offset),
                _ => Err(Error::malformed(offset, "unbalanced ']'")),
            },
            TokenKind::FieldName(name) => match self.stack.last_mut() {
                Some(Frame::Object { key, .. }) if key.is_none() => {
                    *key = Some(name);
                    Ok(None)
                }
                _ => Err(Error::malformed(offset, "field name outside of an object")),
            },
            TokenKind::Scalar(value) => self.complete(value, offset),
        }
    }

    fn finish(&mut self) -> Result<(), Error> {
        if self.stack.is_empty() && !self.in_root_array {
            Ok(())
        } else {
            Err(Error::PrematureEnd)
        }
    }
}
