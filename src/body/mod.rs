//! Request and response bodies.
//!
//! Bodies travel as [`BodyStream`]s of single-owner [`Chunk`]s. The
//! [`BodyInterchange`] picks, per request, which [`BodyReader`] turns a
//! body into typed values and which [`BodyWriter`] turns a handler's
//! [`Entity`] back into a response.

mod error;
mod chunk;
mod type_info;
mod entity;
mod codec;
mod json;
mod raw;
mod interchange;

pub use error::Error;
pub use chunk::{BodyStream, Chunk, Release};
pub use type_info::TypeInfo;
pub use entity::{Deferred, Entity, ErasedValue, Streamed};
pub use codec::{media_matches, BodyReader, BodyWriter, ErasedItem, ErasedStream, Priority, ReadTarget};
pub use json::{JsonCodec, APPLICATION_JSON};
pub use raw::{BytesCodec, TextCodec, APPLICATION_OCTET_STREAM, TEXT_PLAIN};
pub use interchange::BodyInterchange;

pub(crate) use interchange::typed;

use futures::stream::{self, StreamExt};

/// A body with no chunks.
pub fn empty() -> BodyStream {
    stream::empty().boxed()
}

/// A body that yields `chunks` in order.
pub fn from_chunks<I>(chunks: I) -> BodyStream
where
    I: IntoIterator<Item = Chunk>,
    I::IntoIter: Send + 'static,
{
    stream::iter(chunks.into_iter().map(Ok)).boxed()
}
