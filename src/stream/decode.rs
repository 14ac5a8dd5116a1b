//! Demand-driven pipeline from body chunks to decoded values.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use log::debug;

use crate::body::{BodyStream, Error};
use crate::stream::parser::{ReadMode, TokenParser, ValueParser};
use crate::stream::token::ParseToken;
use crate::stream::tokenizer::{JsonTokenizer, Tokenizer};

/// Pulls chunks through a tokenizer and parser, yielding one value per poll.
///
/// Nothing runs ahead of demand: a chunk is pulled from the body only once
/// every token already lexed has been handed to the parser without
/// completing a value. Each chunk is released as soon as the tokenizer has
/// consumed it. Dropping the stream drops the body, which cancels the
/// producer.
///
/// After the first error the stream ends; values completed before the
/// error are still delivered, partial ones never are.
pub struct DecodeStream<T, P> {
    body: Option<BodyStream>,
    tokenizer: T,
    parser: P,
    tokens: VecDeque<ParseToken>,
    deferred_error: Option<Error>,
    body_done: bool,
    done: bool,
}

impl DecodeStream<JsonTokenizer, TokenParser> {
    /// A JSON decoding pipeline over `body`.
    pub fn json(body: BodyStream, mode: ReadMode, max_token_len: usize) -> Self {
        Self::new(
            body,
            JsonTokenizer::with_max_token_len(max_token_len),
            TokenParser::new(mode),
        )
    }
}

impl<T, P> DecodeStream<T, P>
where
    T: Tokenizer,
    P: ValueParser,
{
    pub fn new(body: BodyStream, tokenizer: T, parser: P) -> Self {
        Self {
            body: Some(body),
            tokenizer,
            parser,
            tokens: VecDeque::new(),
            deferred_error: None,
            body_done: false,
            done: false,
        }
    }

    fn fail(&mut self, err: Error) -> Poll<Option<Result<P::Output, Error>>> {
        debug!("Body decode failed: {err}");
        self.done = true;
        self.tokens.clear();
        self.body = None;
        Poll::Ready(Some(Err(err)))
    }
}

impl<T, P> Stream for DecodeStream<T, P>
where
    T: Tokenizer + Unpin,
    P: ValueParser + Unpin,
{
    type Item = Result<P::Output, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }

            while let Some(token) = this.tokens.pop_front() {
                match this.parser.push(token) {
                    Ok(Some(value)) => return Poll::Ready(Some(Ok(value))),
                    Ok(None) => {}
                    Err(err) => return this.fail(err),
                }
            }

            if let Some(err) = this.deferred_error.take() {
                return this.fail(err);
            }

            if this.body_done {
                this.done = true;
                return match this.parser.finish() {
                    Ok(()) => Poll::Ready(None),
                    Err(err) => this.fail(err),
                };
            }

            let next = match this.body.as_mut() {
                Some(body) => body.poll_next_unpin(cx),
                None => Poll::Ready(None),
            };
            match next {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    let fed = this.tokenizer.feed(&chunk, &mut this.tokens);
                    chunk.release();
                    if let Err(err) = fed {
                        this.deferred_error = Some(err);
                    }
                }
                Poll::Ready(Some(Err(err))) => return this.fail(err),
                Poll::Ready(None) => {
                    this.body = None;
                    this.body_done = true;
                    if let Err(err) = this.tokenizer.finish(&mut this.tokens) {
                        this.deferred_error = Some(err);
                    }
                }
            }
        }
    }
}
