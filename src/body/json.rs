//! JSON body codec, the catch-all fallback.

use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::body::chunk::{BodyStream, Chunk};
use crate::body::codec::{BodyReader, BodyWriter, ErasedStream, Priority, ReadTarget};
use crate::body::entity::Entity;
use crate::body::error::Error;
use crate::body::type_info::TypeInfo;
use crate::parser::HttpRequest;
use crate::server::{HttpResponse, StatusCode};
use crate::stream::{DecodeStream, DEFAULT_MAX_TOKEN_LEN};

pub const APPLICATION_JSON: &str = "application/json";

/// Reads and writes any serde type as JSON.
///
/// Registered at [`Priority::LOWEST`] and applicable to every content
/// type, so it only runs when no more specific codec claimed the body.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    max_token_len: usize,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonCodec {
    pub fn new() -> Self {
        Self {
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }

    /// Limit how many bytes a single unfinished token may occupy.
    pub fn with_max_token_len(mut self, max_token_len: usize) -> Self {
        self.max_token_len = max_token_len;
        self
    }
}

impl BodyReader for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn priority(&self) -> Priority {
        Priority::LOWEST
    }

    fn can_read(&self, _request: &HttpRequest, _target: &ReadTarget) -> bool {
        true
    }

    fn read(&self, _request: &HttpRequest, target: ReadTarget, body: BodyStream) -> ErasedStream {
        DecodeStream::json(body, target.mode(), self.max_token_len)
            .map(move |value| value.and_then(|value| target.decode(value)))
            .boxed()
    }
}

impl BodyWriter for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn priority(&self) -> Priority {
        Priority::LOWEST
    }

    fn can_write(&self, _request: &HttpRequest, _ty: &TypeInfo) -> bool {
        true
    }

    fn write(&self, _request: &HttpRequest, _ty: &TypeInfo, entity: Entity) -> Result<HttpResponse, Error> {
        match entity {
            Entity::Value(value) => {
                let mut buf = Vec::new();
                value.write_json(&mut buf).map_err(Error::Encode)?;
                Ok(HttpResponse::new(StatusCode::Ok)
                    .with_content_type(APPLICATION_JSON)
                    .with_body_bytes(buf))
            }
            Entity::Stream { items, .. } => {
                // each element becomes one chunk of a single JSON array
                let open = stream::once(async { Ok(Chunk::new(Bytes::from_static(b"["))) });
                let elements = items.enumerate().map(|(idx, item)| -> Result<Chunk, Error> {
                    let value = item?;
                    let mut buf = Vec::new();
                    if idx > 0 {
                        buf.push(b',');
                    }
                    value.write_json(&mut buf).map_err(Error::Encode)?;
                    Ok(Chunk::new(buf))
                });
                let close = stream::once(async { Ok(Chunk::new(Bytes::from_static(b"]"))) });
                Ok(HttpResponse::new(StatusCode::Ok)
                    .with_content_type(APPLICATION_JSON)
                    .with_body_stream(open.chain(elements).chain(close).boxed()))
            }
            Entity::Pending(_) => Err(Error::Entity("pending entity reached the JSON writer".to_string())),
        }
    }
}
