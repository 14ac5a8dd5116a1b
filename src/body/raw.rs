//! Codecs for bodies that need no parsing: raw bytes and plain text.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};

use crate::body::chunk::{BodyStream, Chunk};
use crate::body::codec::{media_matches, BodyReader, BodyWriter, ErasedItem, ErasedStream, ReadTarget};
use crate::body::entity::{Entity, Streamed};
use crate::body::error::Error;
use crate::body::type_info::TypeInfo;
use crate::parser::HttpRequest;
use crate::server::{HttpResponse, StatusCode};
use crate::stream::ReadMode;

pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Passes body bytes through as [`Bytes`].
///
/// Read as a sequence, every arriving chunk becomes one item. Read as a
/// single value, the whole body is gathered into one buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl BodyReader for BytesCodec {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn can_read(&self, _request: &HttpRequest, target: &ReadTarget) -> bool {
        target.type_info().is::<Bytes>()
    }

    fn read(&self, _request: &HttpRequest, target: ReadTarget, mut body: BodyStream) -> ErasedStream {
        match target.mode() {
            ReadMode::Elements => body
                .map(|chunk| chunk.map(|chunk| Box::new(chunk.to_owned_bytes()) as ErasedItem))
                .boxed(),
            ReadMode::Values => {
                let whole = async move {
                    let mut buf = BytesMut::new();
                    while let Some(chunk) = body.next().await {
                        buf.extend_from_slice(&chunk?);
                    }
                    Ok::<_, Error>(Box::new(buf.freeze()) as ErasedItem)
                };
                stream::once(whole).boxed()
            }
        }
    }
}

impl BodyWriter for BytesCodec {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn can_write(&self, _request: &HttpRequest, ty: &TypeInfo) -> bool {
        ty.is::<Bytes>() || (ty.is::<Streamed>() && ty.first_param().is_some_and(|item| item.is::<Bytes>()))
    }

    fn write(&self, _request: &HttpRequest, _ty: &TypeInfo, entity: Entity) -> Result<HttpResponse, Error> {
        let response = HttpResponse::new(StatusCode::Ok).with_content_type(APPLICATION_OCTET_STREAM);
        match entity {
            Entity::Value(value) => {
                let bytes = value
                    .downcast::<Bytes>()
                    .map_err(|value| Error::Entity(format!("bytes writer cannot write {}", value.type_info())))?;
                Ok(response.with_body_bytes(bytes))
            }
            Entity::Stream { items, .. } => {
                let chunks = items.map(|item| {
                    item.and_then(|value| {
                        value
                            .downcast::<Bytes>()
                            .map(Chunk::new)
                            .map_err(|value| Error::Entity(format!("bytes writer cannot write {}", value.type_info())))
                    })
                });
                Ok(response.with_body_stream(chunks.boxed()))
            }
            Entity::Pending(_) => Err(Error::Entity("pending entity reached the bytes writer".to_string())),
        }
    }
}

/// Reads `text/*` bodies into a `String` and writes `String`s as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl BodyReader for TextCodec {
    fn name(&self) -> &'static str {
        "text"
    }

    fn can_read(&self, request: &HttpRequest, target: &ReadTarget) -> bool {
        target.type_info().is::<String>() && media_matches(request.content_type(), "text/")
    }

    fn read(&self, _request: &HttpRequest, _target: ReadTarget, mut body: BodyStream) -> ErasedStream {
        let text = async move {
            let mut buf = Vec::new();
            while let Some(chunk) = body.next().await {
                buf.extend_from_slice(&chunk?);
            }
            String::from_utf8(buf)
                .map(|text| Box::new(text) as ErasedItem)
                .map_err(|_| Error::InvalidUtf8)
        };
        stream::once(text).boxed()
    }
}

impl BodyWriter for TextCodec {
    fn name(&self) -> &'static str {
        "text"
    }

    fn can_write(&self, request: &HttpRequest, ty: &TypeInfo) -> bool {
        let accept = request.accept();
        ty.is::<String>()
            && (accept.is_none() || media_matches(accept, "text/") || media_matches(accept, "*/*"))
    }

    fn write(&self, _request: &HttpRequest, _ty: &TypeInfo, entity: Entity) -> Result<HttpResponse, Error> {
        match entity {
            Entity::Value(value) => {
                let text = value
                    .downcast::<String>()
                    .map_err(|value| Error::Entity(format!("text writer cannot write {}", value.type_info())))?;
                Ok(HttpResponse::new(StatusCode::Ok)
                    .with_content_type(TEXT_PLAIN)
                    .with_body_string(text))
            }
            other => Err(Error::Entity(format!("text writer cannot write {other:?}"))),
        }
    }
}
