//! Incremental JSON tokenizer.

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};
use serde_json::{Number, Value};

use crate::body::Error;
use crate::stream::token::{ParseToken, TokenKind};

/// Default cap on bytes held for a single unfinished token.
pub const DEFAULT_MAX_TOKEN_LEN: usize = 8 * 1024 * 1024;

const MAX_DEPTH: usize = 512;

/// Turns arbitrarily split input into complete [`ParseToken`]s.
///
/// Implementations keep whatever trailing bytes could not be turned into
/// a token yet and resume from them on the next call. State is per body
/// and must never be shared between requests.
pub trait Tokenizer: Send {
    /// Lex `input`, appending every token completed so far to `out`.
    ///
    /// `input` is copied or consumed before this returns; callers may
    /// release the buffer it came from immediately afterwards.
    fn feed(&mut self, input: &[u8], out: &mut VecDeque<ParseToken>) -> Result<(), Error>;

    /// Signal end of input and flush the last token.
    fn finish(&mut self, out: &mut VecDeque<ParseToken>) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// What the grammar allows next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    ValueOrEnd,
    Key,
    KeyOrEnd,
    Colon,
    CommaOrEnd,
}

/// A JSON tokenizer that accepts any number of whitespace-separated root
/// values, so it covers single documents, top-level arrays and
/// newline-delimited JSON alike.
#[derive(Debug)]
pub struct JsonTokenizer {
    /// Bytes not yet turned into tokens. Always starts at a token boundary.
    pending: BytesMut,
    /// Body offset of `pending[0]`.
    offset: u64,
    /// How far into a string at `pending[0]` has already been scanned.
    string_scan: usize,
    in_escape: bool,
    stack: Vec<Container>,
    expect: Expect,
    max_token_len: usize,
}

impl Default for JsonTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonTokenizer {
    pub fn new() -> Self {
        Self::with_max_token_len(DEFAULT_MAX_TOKEN_LEN)
    }

    pub fn with_max_token_len(max_token_len: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            offset: 0,
            string_scan: 0,
            in_escape: false,
            stack: Vec::new(),
            expect: Expect::Value,
            max_token_len,
        }
    }

    /// Bytes currently carried over waiting for the rest of a token.
    pub fn carried_over(&self) -> usize {
        self.pending.len()
    }

    fn lex(&mut self, out: &mut VecDeque<ParseToken>, eof: bool) -> Result<(), Error> {
        let mut pos = 0;
        let result = loop {
            while pos < self.pending.len() && is_whitespace(self.pending[pos]) {
                pos += 1;
            }
            if pos >= self.pending.len() {
                break Ok(());
            }
            match self.step(pos, eof, out) {
                Ok(Some(next)) => pos = next,
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        self.offset += pos as u64;
        self.pending.advance(pos);
        result
    }

    /// Lex one token starting at `pos`. Returns the position after it, or
    /// `None` if the token is not complete yet.
    fn step(&mut self, pos: usize, eof: bool, out: &mut VecDeque<ParseToken>) -> Result<Option<usize>, Error> {
        let byte = self.pending[pos];
        match self.expect {
            Expect::Colon if byte == b':' => {
                self.expect = Expect::Value;
                Ok(Some(pos + 1))
            }
            Expect::Colon => Err(self.unexpected(pos, "':'")),
            Expect::CommaOrEnd => match (byte, self.stack.last().copied()) {
                (b',', Some(Container::Object)) => {
                    self.expect = Expect::Key;
                    Ok(Some(pos + 1))
                }
                (b',', Some(Container::Array)) => {
                    self.expect = Expect::Value;
                    Ok(Some(pos + 1))
                }
                (b'}', Some(Container::Object)) => Ok(Some(self.close(TokenKind::EndObject, pos, out))),
                (b']', Some(Container::Array)) => Ok(Some(self.close(TokenKind::EndArray, pos, out))),
                _ => Err(self.unexpected(pos, "',' or a closing bracket")),
            },
            Expect::KeyOrEnd if byte == b'}' => Ok(Some(self.close(TokenKind::EndObject, pos, out))),
            Expect::KeyOrEnd | Expect::Key if byte == b'"' => self.string(pos, true, out),
            Expect::KeyOrEnd | Expect::Key => Err(self.unexpected(pos, "a field name")),
            Expect::ValueOrEnd if byte == b']' => Ok(Some(self.close(TokenKind::EndArray, pos, out))),
            Expect::ValueOrEnd | Expect::Value => self.value(pos, eof, out),
        }
    }

    fn value(&mut self, pos: usize, eof: bool, out: &mut VecDeque<ParseToken>) -> Result<Option<usize>, Error> {
        match self.pending[pos] {
            b'{' => self.open(Container::Object, pos, out),
            b'[' => self.open(Container::Array, pos, out),
            b'"' => self.string(pos, false, out),
            b'-' | b'0'..=b'9' => self.number(pos, eof, out),
            b't' => self.literal(pos, b"true", Value::Bool(true), out),
            b'f' => self.literal(pos, b"false", Value::Bool(false), out),
            b'n' => self.literal(pos, b"null", Value::Null, out),
            _ => Err(self.unexpected(pos, "a value")),
        }
    }

    fn open(&mut self, container: Container, pos: usize, out: &mut VecDeque<ParseToken>) -> Result<Option<usize>, Error> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(Error::malformed(self.at(pos), format!("nesting deeper than {MAX_DEPTH}")));
        }
        self.stack.push(container);
        let (kind, expect) = match container {
            Container::Object => (TokenKind::StartObject, Expect::KeyOrEnd),
            Container::Array => (TokenKind::StartArray, Expect::ValueOrEnd),
        };
        out.push_back(ParseToken::new(kind, self.at(pos)));
        self.expect = expect;
        Ok(Some(pos + 1))
    }

    fn close(&mut self, kind: TokenKind, pos: usize, out: &mut VecDeque<ParseToken>) -> usize {
        self.stack.pop();
        out.push_back(ParseToken::new(kind, self.at(pos)));
        self.after_value();
        pos + 1
    }

    fn string(&mut self, pos: usize, is_key: bool, out: &mut VecDeque<ParseToken>) -> Result<Option<usize>, Error> {
        let end = match self.scan_string(pos) {
            Some(end) => end,
            None => return Ok(None),
        };
        let text: String = serde_json::from_slice(&self.pending[pos..end])
            .map_err(|err| Error::malformed(self.at(pos), format!("invalid string: {err}")))?;
        if is_key {
            out.push_back(ParseToken::new(TokenKind::FieldName(text), self.at(pos)));
            self.expect = Expect::Colon;
        } else {
            out.push_back(ParseToken::new(TokenKind::Scalar(Value::String(text)), self.at(pos)));
            self.after_value();
        }
        Ok(Some(end))
    }

    /// Find the closing quote of the string opening at `start`, resuming
    /// where the previous call stopped.
    fn scan_string(&mut self, start: usize) -> Option<usize> {
        let buf = &self.pending[start..];
        let mut idx = self.string_scan.max(1);
        while idx < buf.len() {
            let byte = buf[idx];
            if self.in_escape {
                self.in_escape = false;
            } else if byte == b'\\' {
                self.in_escape = true;
            } else if byte == b'"' {
                self.string_scan = 0;
                return Some(start + idx + 1);
            }
            idx += 1;
        }
        self.string_scan = idx;
        None
    }

    fn number(&mut self, pos: usize, eof: bool, out: &mut VecDeque<ParseToken>) -> Result<Option<usize>, Error> {
        let buf = &self.pending[pos..];
        let len = buf
            .iter()
            .position(|b| !matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'))
            .unwrap_or(buf.len());
        // a number touching the end of the input may continue in the next
        // chunk; inside an open container it cannot be complete even at eof
        if len == buf.len() && (!eof || !self.stack.is_empty()) {
            return Ok(None);
        }
        let number: Number = serde_json::from_slice(&buf[..len]).map_err(|err| {
            Error::malformed(
                self.at(pos),
                format!("invalid number '{}': {err}", String::from_utf8_lossy(&buf[..len])),
            )
        })?;
        out.push_back(ParseToken::new(TokenKind::Scalar(Value::Number(number)), self.at(pos)));
        self.after_value();
        Ok(Some(pos + len))
    }

    fn literal(&mut self, pos: usize, word: &[u8], value: Value, out: &mut VecDeque<ParseToken>) -> Result<Option<usize>, Error> {
        let buf = &self.pending[pos..];
        let available = buf.len().min(word.len());
        if buf[..available] != word[..available] {
            return Err(self.unexpected(pos, "true, false or null"));
        }
        if available < word.len() {
            return Ok(None);
        }
        out.push_back(ParseToken::new(TokenKind::Scalar(value), self.at(pos)));
        self.after_value();
        Ok(Some(pos + word.len()))
    }

    fn after_value(&mut self) {
        self.expect = if self.stack.is_empty() {
            Expect::Value
        } else {
            Expect::CommaOrEnd
        };
    }

    fn at(&self, pos: usize) -> u64 {
        self.offset + pos as u64
    }

    fn unexpected(&self, pos: usize, expected: &str) -> Error {
        Error::malformed(
            self.at(pos),
            format!("unexpected '{}', expected {expected}", self.pending[pos].escape_ascii()),
        )
    }
}

impl Tokenizer for JsonTokenizer {
    fn feed(&mut self, input: &[u8], out: &mut VecDeque<ParseToken>) -> Result<(), Error> {
        self.pending.extend_from_slice(input);
        self.lex(out, false)?;
        if self.pending.len() > self.max_token_len {
            return Err(Error::TokenTooLarge(self.max_token_len));
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut VecDeque<ParseToken>) -> Result<(), Error> {
        self.lex(out, true)?;
        if !self.pending.is_empty() || !self.stack.is_empty() {
            return Err(Error::PrematureEnd);
        }
        Ok(())
    }
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}
