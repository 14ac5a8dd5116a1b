//! Per-request codec negotiation.

use std::any::type_name;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use log::trace;
use serde::de::DeserializeOwned;

use crate::body::chunk::BodyStream;
use crate::body::codec::{BodyReader, BodyWriter, ErasedStream, ReadTarget};
use crate::body::entity::Entity;
use crate::body::error::Error;
use crate::body::json::JsonCodec;
use crate::body::raw::{BytesCodec, TextCodec};
use crate::body::type_info::TypeInfo;
use crate::parser::HttpRequest;
use crate::server::HttpResponse;
use crate::stream::ReadMode;

/// Ordered sets of body readers and writers.
///
/// Both lists are kept sorted by ascending [`Priority`](crate::body::Priority);
/// codecs with equal priority keep their registration order. Selection
/// picks the first codec that declares itself applicable.
#[derive(Clone)]
pub struct BodyInterchange {
    readers: Vec<Arc<dyn BodyReader>>,
    writers: Vec<Arc<dyn BodyWriter>>,
}

impl Default for BodyInterchange {
    /// The built-in codecs: raw bytes, plain text, and JSON as the fallback.
    fn default() -> Self {
        let mut interchange = Self::new();
        interchange
            .add_codec(BytesCodec)
            .add_codec(TextCodec)
            .add_codec(JsonCodec::new());
        interchange
    }
}

impl BodyInterchange {
    /// An interchange with no codecs.
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
        }
    }

    pub fn add_reader<R: BodyReader + 'static>(&mut self, reader: R) -> &mut Self {
        let priority = reader.priority();
        let idx = self.readers.partition_point(|existing| existing.priority() <= priority);
        self.readers.insert(idx, Arc::new(reader));
        self
    }

    pub fn add_writer<W: BodyWriter + 'static>(&mut self, writer: W) -> &mut Self {
        let priority = writer.priority();
        let idx = self.writers.partition_point(|existing| existing.priority() <= priority);
        self.writers.insert(idx, Arc::new(writer));
        self
    }

    /// Register a type that both reads and writes.
    pub fn add_codec<C: BodyReader + BodyWriter + Clone + 'static>(&mut self, codec: C) -> &mut Self {
        self.add_reader(codec.clone()).add_writer(codec)
    }

    /// Reader names in selection order.
    pub fn reader_names(&self) -> Vec<&'static str> {
        self.readers.iter().map(|reader| reader.name()).collect()
    }

    /// Writer names in selection order.
    pub fn writer_names(&self) -> Vec<&'static str> {
        self.writers.iter().map(|writer| writer.name()).collect()
    }

    /// The first reader applicable to `target`.
    pub fn select_reader(&self, request: &HttpRequest, target: &ReadTarget) -> Result<Arc<dyn BodyReader>, Error> {
        match self.readers.iter().find(|reader| reader.can_read(request, target)) {
            Some(reader) => {
                trace!("Reading {} with the {} reader", target.type_info(), reader.name());
                Ok(reader.clone())
            }
            None => Err(Error::UnsupportedType {
                type_name: target.type_info().to_string(),
                media_type: request.content_type().unwrap_or("none").to_string(),
            }),
        }
    }

    /// The first writer applicable to `ty`.
    pub fn select_writer(&self, request: &HttpRequest, ty: &TypeInfo) -> Result<Arc<dyn BodyWriter>, Error> {
        match self.writers.iter().find(|writer| writer.can_write(request, ty)) {
            Some(writer) => {
                trace!("Writing {ty} with the {} writer", writer.name());
                Ok(writer.clone())
            }
            None => Err(Error::UnsupportedType {
                type_name: ty.to_string(),
                media_type: request.accept().unwrap_or("*/*").to_string(),
            }),
        }
    }

    /// Decode `body` into a lazy sequence of `T`s.
    ///
    /// Fails right away with [`Error::UnsupportedType`] when no reader
    /// applies; decoding errors surface as items of the stream.
    pub fn read<T>(&self, request: &HttpRequest, body: BodyStream, mode: ReadMode) -> Result<BoxStream<'static, Result<T, Error>>, Error>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let target = ReadTarget::of::<T>(mode);
        let reader = self.select_reader(request, &target)?;
        Ok(typed(reader.read(request, target, body)))
    }

    /// Turn `entity` into a response.
    ///
    /// A pending entity is awaited first and the write is retried with the
    /// resolved entity, typed by the first parameter of `declared` if it
    /// has one and by the resolved value otherwise.
    pub fn write<'a>(&'a self, request: &'a HttpRequest, declared: TypeInfo, entity: Entity) -> BoxFuture<'a, Result<HttpResponse, Error>> {
        Box::pin(async move {
            match entity {
                Entity::Pending(pending) => {
                    let resolved = pending.await?;
                    let inner = declared
                        .first_param()
                        .cloned()
                        .unwrap_or_else(|| resolved.type_info());
                    self.write(request, inner, resolved).await
                }
                entity => {
                    let writer = self.select_writer(request, &declared)?;
                    writer.write(request, &declared, entity)
                }
            }
        })
    }
}

/// Recover the concrete type of reader output.
pub(crate) fn typed<T: Send + 'static>(items: ErasedStream) -> BoxStream<'static, Result<T, Error>> {
    items
        .map(|item| {
            item.and_then(|value| {
                value
                    .downcast::<T>()
                    .map(|value| *value)
                    .map_err(|_| Error::Entity(format!("reader produced a value that is not {}", type_name::<T>())))
            })
        })
        .boxed()
}
