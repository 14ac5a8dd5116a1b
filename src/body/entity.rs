//! Type-erased response values handed to body writers.

use std::any::Any;
use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::ser::Error as _;
use serde::Serialize;

use crate::body::error::Error;
use crate::body::type_info::TypeInfo;

type SerializeFn = fn(&(dyn Any + Send), &mut Vec<u8>) -> serde_json::Result<()>;

/// Marker raw type for a lazily produced sequence of values.
pub struct Streamed;

/// Marker raw type for a value that is not available yet.
pub struct Deferred;

/// A single value with its type recorded, ready for a [`BodyWriter`].
///
/// [`BodyWriter`]: crate::body::BodyWriter
pub struct ErasedValue {
    type_info: TypeInfo,
    value: Box<dyn Any + Send>,
    serialize: SerializeFn,
}

impl ErasedValue {
    pub fn new<T: Serialize + Send + 'static>(value: T) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            value: Box::new(value),
            serialize: serialize_json::<T>,
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the value back out if it is a `T`.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        let Self {
            type_info,
            value,
            serialize,
        } = self;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                type_info,
                value,
                serialize,
            }),
        }
    }

    /// Append the JSON form of the value to `out`.
    pub fn write_json(&self, out: &mut Vec<u8>) -> serde_json::Result<()> {
        (self.serialize)(self.value.as_ref(), out)
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type", &self.type_info)
            .finish()
    }
}

fn serialize_json<T: Serialize + 'static>(value: &(dyn Any + Send), out: &mut Vec<u8>) -> serde_json::Result<()> {
    match value.downcast_ref::<T>() {
        Some(value) => serde_json::to_writer(out, value),
        None => Err(serde_json::Error::custom("value does not match its recorded type")),
    }
}

/// What a handler asks to send back: a value, a lazy sequence of values,
/// or a value that is still being computed.
pub enum Entity {
    Value(ErasedValue),
    Stream {
        item: TypeInfo,
        items: BoxStream<'static, Result<ErasedValue, Error>>,
    },
    Pending(BoxFuture<'static, Result<Entity, Error>>),
}

impl Entity {
    pub fn value<T: Serialize + Send + 'static>(value: T) -> Self {
        Entity::Value(ErasedValue::new(value))
    }

    /// A sequence of `T`s produced on demand.
    pub fn stream<T, S>(items: S) -> Self
    where
        T: Serialize + Send + 'static,
        S: Stream<Item = Result<T, Error>> + Send + 'static,
    {
        Entity::Stream {
            item: TypeInfo::of::<T>(),
            items: items.map(|item| item.map(ErasedValue::new)).boxed(),
        }
    }

    /// A value that becomes available once `future` resolves.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Entity, Error>> + Send + 'static,
    {
        Entity::Pending(Box::pin(future))
    }

    /// The type writers should be selected for.
    pub fn type_info(&self) -> TypeInfo {
        match self {
            Entity::Value(value) => value.type_info().clone(),
            Entity::Stream { item, .. } => TypeInfo::of::<Streamed>().with_params(vec![item.clone()]),
            Entity::Pending(_) => TypeInfo::of::<Deferred>(),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Entity::Stream { item, .. } => f.debug_struct("Stream").field("item", item).finish(),
            Entity::Pending(_) => f.write_str("Pending"),
        }
    }
}
