//! The read side of a connection: request heads and lazily read bodies.

use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, StreamExt};
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

use crate::body::{BodyStream, Chunk, Error as BodyError};
use crate::parser::{parse_request_head, ChunkedDecoder, ChunkedEvent, Error as ParserError, HttpRequest};
use crate::server::error::Error;

/// How the body of the current request is delimited.
#[derive(Debug)]
enum Framing {
    /// No body left to read.
    Done,
    Length(u64),
    Chunked(ChunkedDecoder),
}

/// Buffered reader shared by the connection loop and the body stream of
/// the request in flight.
pub(crate) struct Inbound<R> {
    io: R,
    buf: BytesMut,
    read_size: usize,
    framing: Framing,
}

impl<R> Inbound<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub(crate) fn new(io: R, read_size: usize) -> Self {
        Self {
            io,
            buf: BytesMut::with_capacity(read_size),
            read_size: read_size.max(1),
            framing: Framing::Done,
        }
    }

    /// Read until a full request head is buffered.
    ///
    /// Returns `Ok(None)` when the peer closed the connection between
    /// requests.
    pub(crate) async fn read_head(&mut self, max_head_size: usize) -> Result<Option<HttpRequest>, Error> {
        loop {
            if !self.buf.is_empty() {
                if let Some((request, consumed)) = parse_request_head(&self.buf)? {
                    self.buf.advance(consumed);
                    return Ok(Some(request));
                }
            }
            if self.buf.len() > max_head_size {
                return Err(ParserError::HeadTooLarge(max_head_size).into());
            }
            if self.fill().await? == 0 {
                return if self.buf.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::UnexpectedEof)
                };
            }
        }
    }

    /// Set up body framing for `request`.
    pub(crate) fn start_body(&mut self, request: &HttpRequest) -> Result<(), ParserError> {
        self.framing = if request.is_chunked() {
            Framing::Chunked(ChunkedDecoder::new())
        } else {
            match request.content_length()? {
                Some(len) if len > 0 => Framing::Length(len),
                _ => Framing::Done,
            }
        };
        Ok(())
    }

    /// The next piece of body data, or `None` once the body is complete.
    pub(crate) async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        loop {
            match self.framing {
                Framing::Done => return Ok(None),
                Framing::Length(remaining) => {
                    if self.buf.is_empty() {
                        self.fill_body().await?;
                        continue;
                    }
                    let take = remaining.min(self.buf.len() as u64).min(self.read_size as u64) as usize;
                    let left = remaining - take as u64;
                    self.framing = if left == 0 { Framing::Done } else { Framing::Length(left) };
                    return Ok(Some(self.buf.split_to(take).freeze()));
                }
                Framing::Chunked(ref mut decoder) => match decoder.decode(&mut self.buf) {
                    Ok(Some(ChunkedEvent::Data(data))) => return Ok(Some(data)),
                    Ok(Some(ChunkedEvent::End)) => {
                        self.framing = Framing::Done;
                        return Ok(None);
                    }
                    Ok(None) => self.fill_body().await?,
                    Err(err) => {
                        self.framing = Framing::Done;
                        return Err(BodyError::malformed(0, err.to_string()));
                    }
                },
            }
        }
    }

    /// Skip whatever the handler left unread so the next request starts
    /// at a head.
    pub(crate) async fn discard_body(&mut self) -> Result<(), BodyError> {
        let mut skipped = 0;
        while let Some(data) = self.next_chunk().await? {
            skipped += data.len();
        }
        if skipped > 0 {
            trace!("Discarded {skipped} unread body bytes");
        }
        Ok(())
    }

    /// A lazy stream over the current request's body.
    ///
    /// Each poll locks the reader just long enough to produce one chunk.
    pub(crate) fn body_stream(inbound: Arc<Mutex<Self>>) -> BodyStream {
        stream::unfold(Some(inbound), |inbound| async move {
            let inbound = match inbound {
                Some(inbound) => inbound,
                None => return None,
            };
            let next = inbound.lock().await.next_chunk().await;
            match next {
                Ok(Some(data)) => Some((Ok(Chunk::new(data)), Some(inbound))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
        .boxed()
    }

    async fn fill(&mut self) -> std::io::Result<usize> {
        self.buf.reserve(self.read_size);
        self.io.read_buf(&mut self.buf).await
    }

    async fn fill_body(&mut self) -> Result<(), BodyError> {
        if self.fill().await? == 0 {
            self.framing = Framing::Done;
            return Err(BodyError::PrematureEnd);
        }
        Ok(())
    }
}
