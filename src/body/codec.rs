//! Reader and writer capabilities the interchange selects from.

use std::any::Any;

use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::body::chunk::BodyStream;
use crate::body::entity::Entity;
use crate::body::error::Error;
use crate::body::type_info::TypeInfo;
use crate::parser::HttpRequest;
use crate::server::HttpResponse;
use crate::stream::ReadMode;

/// A decoded value whose concrete type is recorded in the [`ReadTarget`].
pub type ErasedItem = Box<dyn Any + Send>;

/// Values produced by a [`BodyReader`], in body order.
pub type ErasedStream = BoxStream<'static, Result<ErasedItem, Error>>;

type DecodeFn = fn(Value) -> Result<ErasedItem, serde_json::Error>;

/// Selection order for codecs. Lower values are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i32);

impl Priority {
    pub const HIGHEST: Priority = Priority(i32::MIN);
    pub const DEFAULT: Priority = Priority(0);
    /// Reserved for catch-all fallbacks such as JSON.
    pub const LOWEST: Priority = Priority(i32::MAX);

    pub const fn new(value: i32) -> Self {
        Priority(value)
    }
}

/// The type a handler wants out of the request body.
pub struct ReadTarget {
    type_info: TypeInfo,
    mode: ReadMode,
    decode: DecodeFn,
}

impl ReadTarget {
    pub fn of<T: DeserializeOwned + Send + 'static>(mode: ReadMode) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            mode,
            decode: decode_json::<T>,
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Map a structured value onto the target type.
    pub fn decode(&self, value: Value) -> Result<ErasedItem, Error> {
        (self.decode)(value).map_err(Error::from)
    }
}

fn decode_json<T: DeserializeOwned + Send + 'static>(value: Value) -> Result<ErasedItem, serde_json::Error> {
    serde_json::from_value::<T>(value).map(|value| Box::new(value) as ErasedItem)
}

/// Converts a request body into values of a requested type.
pub trait BodyReader: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> Priority {
        Priority::DEFAULT
    }

    /// Whether this reader handles `target` for the request's content type.
    /// Returning `false` lets the next reader try.
    fn can_read(&self, request: &HttpRequest, target: &ReadTarget) -> bool;

    fn read(&self, request: &HttpRequest, target: ReadTarget, body: BodyStream) -> ErasedStream;
}

/// Converts a handler's [`Entity`] into a response body.
pub trait BodyWriter: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> Priority {
        Priority::DEFAULT
    }

    /// Whether this writer can emit `ty` for the request's Accept header.
    fn can_write(&self, request: &HttpRequest, ty: &TypeInfo) -> bool;

    /// Produce the response. `entity` is never [`Entity::Pending`].
    fn write(&self, request: &HttpRequest, ty: &TypeInfo, entity: Entity) -> Result<HttpResponse, Error>;
}

/// Case-insensitive substring match of a media type token against a header.
pub fn media_matches(header: Option<&str>, token: &str) -> bool {
    header
        .map(|value| value.to_ascii_lowercase().contains(&token.to_ascii_lowercase()))
        .unwrap_or(false)
}
