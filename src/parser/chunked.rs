//! Resumable decoder for `Transfer-Encoding: chunked` bodies.

use bytes::{Buf, Bytes, BytesMut};

use crate::parser::error::Error;

/// Longest size or trailer line accepted before giving up.
const MAX_LINE_LEN: usize = 4096;

/// Output of one decoding step.
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkedEvent {
    /// A slice of body data. A single wire chunk may produce several.
    Data(Bytes),
    /// The terminating zero-size chunk and its trailers were consumed.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    Data(u64),
    DataCrlf,
    Trailers,
    Done,
}

/// Decodes chunked framing from a buffer that fills up over time.
///
/// Each call consumes what it can from the front of the buffer and leaves
/// partial lines in place, so the caller can append more bytes and call
/// again.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: State,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size }
    }

    /// Whether the terminating chunk has been seen.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Decode the next event from `buf`.
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold enough bytes to make
    /// progress.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ChunkedEvent>, Error> {
        loop {
            match self.state {
                State::Size => {
                    let line = match take_line(buf)? {
                        Some(line) => line,
                        None => return Ok(None),
                    };
                    let size = parse_size(&line)?;
                    self.state = if size == 0 { State::Trailers } else { State::Data(size) };
                }
                State::Data(remaining) => {
                    if buf.is_empty() {
                        return Ok(None);
                    }
                    let take = remaining.min(buf.len() as u64) as usize;
                    let data = buf.split_to(take).freeze();
                    let left = remaining - take as u64;
                    self.state = if left == 0 { State::DataCrlf } else { State::Data(left) };
                    return Ok(Some(ChunkedEvent::Data(data)));
                }
                State::DataCrlf => {
                    if buf.len() < 2 {
                        return Ok(None);
                    }
                    if &buf[..2] != b"\r\n" {
                        return Err(Error::InvalidChunk("missing CRLF after chunk data".to_string()));
                    }
                    buf.advance(2);
                    self.state = State::Size;
                }
                State::Trailers => {
                    let line = match take_line(buf)? {
                        Some(line) => line,
                        None => return Ok(None),
                    };
                    if line.is_empty() {
                        self.state = State::Done;
                        return Ok(Some(ChunkedEvent::End));
                    }
                }
                State::Done => return Ok(Some(ChunkedEvent::End)),
            }
        }
    }
}

/// Remove one CRLF-terminated line from the front of `buf`, without the CRLF.
fn take_line(buf: &mut BytesMut) -> Result<Option<BytesMut>, Error> {
    match buf.windows(2).position(|w| w == b"\r\n") {
        Some(pos) => {
            let line = buf.split_to(pos);
            buf.advance(2);
            Ok(Some(line))
        }
        None if buf.len() > MAX_LINE_LEN => {
            Err(Error::InvalidChunk(format!("line longer than {MAX_LINE_LEN} bytes")))
        }
        None => Ok(None),
    }
}

fn parse_size(line: &[u8]) -> Result<u64, Error> {
    let text = std::str::from_utf8(line)
        .map_err(|_| Error::InvalidChunk("size line is not UTF-8".to_string()))?;
    // chunk extensions follow a ';' and are ignored
    let digits = text.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(digits, 16)
        .map_err(|_| Error::InvalidChunk(format!("invalid chunk size '{digits}'")))
}
