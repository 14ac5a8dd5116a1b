//! Tests for incremental tokenizing and decoding.

#[cfg(test)]
mod stream_tests {
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use futures::executor::block_on;
    use futures::stream::{self, Stream, StreamExt, TryStreamExt};
    use futures::task::noop_waker;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use crate::body::{BodyStream, Chunk, Error, Release};
    use crate::stream::{
        DecodeStream, JsonTokenizer, ParseToken, ReadMode, TokenKind, TokenParser, Tokenizer, ValueParser,
    };

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Release for Counter {
        fn release(&self, _len: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Counter {
        fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn tracked(parts: Vec<Vec<u8>>, counter: &Arc<Counter>) -> BodyStream {
        let hook: Arc<dyn Release> = counter.clone();
        let chunks: Vec<Result<Chunk, Error>> = parts
            .into_iter()
            .map(|part| Ok(Chunk::with_release(part, hook.clone())))
            .collect();
        stream::iter(chunks).boxed()
    }

    fn split_at(input: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
        let mut cuts: Vec<usize> = cuts.iter().map(|cut| cut % (input.len() + 1)).collect();
        cuts.sort_unstable();
        cuts.dedup();
        let mut parts = Vec::new();
        let mut start = 0;
        for cut in cuts {
            parts.push(input[start..cut].to_vec());
            start = cut;
        }
        parts.push(input[start..].to_vec());
        parts
    }

    fn tokens(parts: &[&str]) -> Result<Vec<TokenKind>, Error> {
        let mut tokenizer = JsonTokenizer::new();
        let mut out = VecDeque::new();
        for part in parts {
            tokenizer.feed(part.as_bytes(), &mut out)?;
        }
        tokenizer.finish(&mut out)?;
        Ok(out.into_iter().map(|token| token.kind).collect())
    }

    fn decode(parts: Vec<Vec<u8>>, mode: ReadMode) -> Vec<Result<Value, Error>> {
        let counter = Arc::new(Counter::default());
        block_on(DecodeStream::json(tracked(parts, &counter), mode, 1024).collect())
    }

    #[test]
    fn test_tokenizer_emits_structure() {
        let kinds = tokens(&[r#"{"a": [1, true, null], "b": "x"}"#]).unwrap();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StartObject,
                TokenKind::FieldName("a".to_string()),
                TokenKind::StartArray,
                TokenKind::Scalar(json!(1)),
                TokenKind::Scalar(json!(true)),
                TokenKind::Scalar(Value::Null),
                TokenKind::EndArray,
                TokenKind::FieldName("b".to_string()),
                TokenKind::Scalar(json!("x")),
                TokenKind::EndObject,
            ]
        );
    }

    #[test]
    fn test_tokens_are_never_split() {
        let whole = tokens(&[r#"{"name": "café \"x\"", "n": -12.5e3, "ok": false}"#]).unwrap();
        let pieces = tokens(&[r#"{"na"#, r#"me": "caf\u0"#, r#"0e9 \"#, r#""x\"", "n": -1"#, "2.5e", r#"3, "ok": fa"#, "lse}"]).unwrap();
        assert_eq!(whole, pieces);
        assert!(whole.contains(&TokenKind::Scalar(json!("café \"x\""))));
    }

    #[test]
    fn test_token_offsets() {
        let mut tokenizer = JsonTokenizer::new();
        let mut out = VecDeque::new();
        tokenizer.feed(b"  [1", &mut out).unwrap();
        tokenizer.feed(b"0, 2]", &mut out).unwrap();
        tokenizer.finish(&mut out).unwrap();
        let offsets: Vec<u64> = out.iter().map(|token| token.offset).collect();
        assert_eq!(offsets, vec![2, 3, 7, 8]);
    }

    #[test]
    fn test_number_at_chunk_end_waits_for_more() {
        let mut tokenizer = JsonTokenizer::new();
        let mut out = VecDeque::new();
        tokenizer.feed(b"12", &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(tokenizer.carried_over(), 2);
        tokenizer.feed(b"34 ", &mut out).unwrap();
        assert_eq!(out.pop_front().map(|token| token.kind), Some(TokenKind::Scalar(json!(1234))));
    }

    #[test]
    fn test_tokenizer_rejects_bad_syntax() {
        assert!(matches!(tokens(&["[1 2]"]), Err(Error::MalformedBody { offset: 3, .. })));
        assert!(matches!(tokens(&["{1: 2}"]), Err(Error::MalformedBody { .. })));
        assert!(matches!(tokens(&["[tru", "x]"]), Err(Error::MalformedBody { .. })));
        assert!(matches!(tokens(&["]"]), Err(Error::MalformedBody { .. })));
    }

    #[test]
    fn test_tokenizer_premature_end() {
        assert!(matches!(tokens(&["[1, 2"]), Err(Error::PrematureEnd)));
        assert!(matches!(tokens(&["\"unterminated"]), Err(Error::PrematureEnd)));
    }

    #[test]
    fn test_token_size_limit() {
        let mut tokenizer = JsonTokenizer::with_max_token_len(8);
        let mut out = VecDeque::new();
        let result = tokenizer.feed(b"\"0123456789", &mut out);
        assert!(matches!(result, Err(Error::TokenTooLarge(8))));
    }

    #[test]
    fn test_parser_values_mode_keeps_root_array() {
        let mut parser = TokenParser::new(ReadMode::Values);
        let mut emitted = Vec::new();
        for kind in [
            TokenKind::StartArray,
            TokenKind::Scalar(json!(1)),
            TokenKind::Scalar(json!(2)),
            TokenKind::EndArray,
        ] {
            if let Some(value) = parser.push(ParseToken::new(kind, 0)).unwrap() {
                emitted.push(value);
            }
        }
        parser.finish().unwrap();
        assert_eq!(emitted, vec![json!([1, 2])]);
    }

    #[test]
    fn test_parser_unbalanced_is_premature_end() {
        let mut parser = TokenParser::new(ReadMode::Elements);
        parser.push(ParseToken::new(TokenKind::StartArray, 0)).unwrap();
        parser.push(ParseToken::new(TokenKind::StartObject, 1)).unwrap();
        assert!(matches!(parser.finish(), Err(Error::PrematureEnd)));
    }

    #[test]
    fn test_decode_elements_of_root_array() {
        let values: Vec<Value> = decode(vec![br#"[{"id":1},{"id""#.to_vec(), br#":2},[3],"four"]"#.to_vec()], ReadMode::Elements)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values, vec![json!({"id": 1}), json!({"id": 2}), json!([3]), json!("four")]);
    }

    #[test]
    fn test_decode_newline_delimited_values() {
        let values: Vec<Value> = decode(vec![b"{\"a\":1}\n{\"a\"".to_vec(), b":2}\n3\n".to_vec()], ReadMode::Values)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values, vec![json!({"a": 1}), json!({"a": 2}), json!(3)]);
    }

    #[test]
    fn test_decode_empty_body() {
        assert!(decode(Vec::new(), ReadMode::Elements).is_empty());
        assert!(decode(vec![b"[]".to_vec()], ReadMode::Elements).is_empty());
    }

    #[test]
    fn test_values_before_error_are_delivered() {
        let results = decode(vec![b"[1, 2, {\"x\":".to_vec(), b" oops}]".to_vec()], ReadMode::Elements);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &json!(1));
        assert_eq!(results[1].as_ref().unwrap(), &json!(2));
        assert!(matches!(results[2], Err(Error::MalformedBody { .. })));
    }

    #[test]
    fn test_truncated_body_is_premature_end() {
        let results = decode(vec![b"[1, {\"x\": 2".to_vec()], ReadMode::Elements);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::PrematureEnd)));
    }

    #[test]
    fn test_transport_error_ends_stream() {
        let body: BodyStream = stream::iter(vec![
            Ok(Chunk::new("[1,")),
            Err(Error::Transport("connection reset".to_string())),
            Ok(Chunk::new("2]")),
        ])
        .boxed();
        let results: Vec<_> = block_on(DecodeStream::json(body, ReadMode::Elements, 1024).collect());
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(Error::Transport(_))));
    }

    #[test]
    fn test_every_chunk_released_on_error() {
        let counter = Arc::new(Counter::default());
        let body = tracked(vec![b"[1,".to_vec(), b"x".to_vec(), b"2]".to_vec(), b" ".to_vec()], &counter);
        let results: Vec<_> = block_on(DecodeStream::json(body, ReadMode::Elements, 1024).collect());
        assert!(results.last().unwrap().is_err());
        assert_eq!(counter.get(), 4);
    }

    #[test]
    fn test_every_chunk_released_on_cancel() {
        let counter = Arc::new(Counter::default());
        let body = tracked(vec![b"[1,".to_vec(), b"2,".to_vec(), b"3]".to_vec()], &counter);
        let mut decoded = DecodeStream::json(body, ReadMode::Elements, 1024);

        let first = block_on(decoded.next()).unwrap().unwrap();
        assert_eq!(first, json!(1));
        assert_eq!(counter.get(), 1);

        drop(decoded);
        assert_eq!(counter.get(), 3);
    }

    /// Counts how many chunks have been pulled from the body.
    struct Pulls<S> {
        inner: S,
        pulled: Arc<AtomicUsize>,
    }

    impl<S: Stream + Unpin> Stream for Pulls<S> {
        type Item = S::Item;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
            let next = self.inner.poll_next_unpin(cx);
            if let Poll::Ready(Some(_)) = next {
                self.pulled.fetch_add(1, Ordering::SeqCst);
            }
            next
        }
    }

    #[test]
    fn test_no_chunk_pulled_ahead_of_demand() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let body = Pulls {
            inner: stream::iter(vec![Ok(Chunk::new("[1, 2, 3")), Ok(Chunk::new(", 4]"))]),
            pulled: pulled.clone(),
        }
        .boxed();
        let mut decoded = DecodeStream::json(body, ReadMode::Elements, 1024);
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        for expected in [1, 2, 3] {
            match decoded.poll_next_unpin(&mut cx) {
                Poll::Ready(Some(Ok(value))) => assert_eq!(value, json!(expected)),
                other => panic!("unexpected poll result: {other:?}"),
            }
            // 3 is only complete once the next chunk shows where it ends
            let wanted = if expected < 3 { 1 } else { 2 };
            assert_eq!(pulled.load(Ordering::SeqCst), wanted);
        }
    }

    #[test]
    fn test_reads_through_try_stream_adapters() {
        let counter = Arc::new(Counter::default());
        let body = tracked(vec![b"[\"a\",".to_vec(), b"\"b\"]".to_vec()], &counter);
        let values: Vec<Value> = block_on(DecodeStream::json(body, ReadMode::Elements, 1024).try_collect()).unwrap();
        assert_eq!(values, vec![json!("a"), json!("b")]);
    }

    fn sample_array() -> impl Strategy<Value = Vec<Value>> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            "[a-z\\\\\"é ]{0,12}".prop_map(Value::from),
        ];
        let element = leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        });
        prop::collection::vec(element, 0..12)
    }

    proptest! {
        #[test]
        fn prop_array_elements_survive_any_split(
            items in sample_array(),
            cuts in prop::collection::vec(any::<usize>(), 0..16),
        ) {
            let encoded = serde_json::to_vec(&Value::Array(items.clone())).unwrap();
            let parts = split_at(&encoded, &cuts);
            let chunk_count = parts.len();

            let counter = Arc::new(Counter::default());
            let decoded: Vec<Value> =
                block_on(DecodeStream::json(tracked(parts, &counter), ReadMode::Elements, 1 << 20).try_collect()).unwrap();

            prop_assert_eq!(decoded, items);
            prop_assert_eq!(counter.get(), chunk_count);
        }

        #[test]
        fn prop_truncated_documents_never_yield_partial_values(
            items in sample_array(),
            cut in any::<usize>(),
        ) {
            let encoded = serde_json::to_vec(&Value::Array(items.clone())).unwrap();
            let cut = cut % encoded.len();
            let results = decode(vec![encoded[..cut].to_vec()], ReadMode::Elements);

            let delivered: Vec<&Value> = results.iter().filter_map(|result| result.as_ref().ok()).collect();
            prop_assert!(delivered.len() <= items.len());
            for (value, item) in delivered.iter().zip(items.iter()) {
                prop_assert_eq!(*value, item);
            }
            prop_assert!(results.last().map_or(cut == 0, |last| last.is_err()));
        }
    }
}
