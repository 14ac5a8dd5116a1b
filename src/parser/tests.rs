//! Tests for the HTTP parser.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use bytes::BytesMut;

    use crate::parser::{
        parse_request_head, ChunkedDecoder, ChunkedEvent, Error, HttpRequest, HttpVersion, Method,
    };

    fn parse(input: &[u8]) -> Result<HttpRequest, Error> {
        parse_request_head(input).map(|parsed| parsed.expect("complete head").0)
    }

    #[test]
    fn test_parse_simple_get_request() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let (result, consumed) = parse_request_head(request).unwrap().unwrap();
        assert_eq!(result.method, Method::GET);
        assert_eq!(result.path, "/index.html");
        assert_eq!(result.version, HttpVersion::Http11);
        assert_eq!(result.headers.get("Host").unwrap(), "example.com");
        assert_eq!(consumed, request.len());
    }

    #[test]
    fn test_incomplete_head_needs_more_input() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: exa";
        assert!(parse_request_head(request).unwrap().is_none());
    }

    #[test]
    fn test_body_bytes_are_not_consumed() {
        let request = b"POST /api HTTP/1.1\r\nHost: a\r\nContent-Length: 4\r\n\r\nbody";
        let (result, consumed) = parse_request_head(request).unwrap().unwrap();
        assert_eq!(&request[consumed..], b"body");
        assert_eq!(result.content_length().unwrap(), Some(4));
    }

    #[test]
    fn test_case_insensitive_headers() {
        let result = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert!(result.has_header("host"));
        assert!(result.has_header("HOST"));
        assert!(result.has_header("Host"));
    }

    #[test]
    fn test_missing_host_header() {
        let result = parse(b"GET /index.html HTTP/1.1\r\nAccept: */*\r\n\r\n");
        assert!(matches!(result, Err(Error::MissingHeader(ref h)) if h == "Host"));
    }

    #[test]
    fn test_invalid_method() {
        let result = parse(b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n");
        assert!(matches!(result, Err(Error::InvalidMethod(ref m)) if m == "INVALID"));
    }

    #[test]
    fn test_invalid_http_version() {
        let result = parse(b"GET /index.html HTTP/9.9\r\nHost: example.com\r\n\r\n");
        assert!(matches!(result, Err(Error::InvalidVersion(ref v)) if v == "HTTP/9.9"));
    }

    #[test]
    fn test_invalid_header_format() {
        let result = parse(b"GET /index.html HTTP/1.1\r\nHost: a\r\nInvalidHeader\r\n\r\n");
        assert!(matches!(result, Err(Error::InvalidHeaderFormat)));
    }

    #[test]
    fn test_empty_request() {
        let result = parse(b"\r\n\r\n");
        assert!(matches!(result, Err(Error::EmptyRequest)));
    }

    #[test]
    fn test_relative_path_rejected() {
        let result = parse(b"GET index.html HTTP/1.1\r\nHost: a\r\n\r\n");
        assert!(matches!(result, Err(Error::InvalidPath)));
    }

    #[test]
    fn test_http10_without_host() {
        let result = parse(b"GET /index.html HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(result.version, HttpVersion::Http10);
        assert!(result.headers.is_empty());
        assert!(!result.keep_alive());
    }

    #[test]
    fn test_headers_with_multiple_colons() {
        let result = parse(b"GET / HTTP/1.1\r\nHost: example.com\r\nX-Test: value:with:colons\r\n\r\n").unwrap();
        assert_eq!(result.headers.get("X-Test").unwrap(), "value:with:colons");
    }

    #[test]
    fn test_mixed_line_endings() {
        let result = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\nUser-Agent: test\r\n\r\n").unwrap();
        assert_eq!(result.headers.get("Host").unwrap(), "example.com");
        assert_eq!(result.headers.get("User-Agent").unwrap(), "test");
    }

    #[test]
    fn test_path_with_query_parameters() {
        let result = parse(b"GET /search?q=test&flag&page=1 HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert_eq!(result.path, "/search?q=test&flag&page=1");
        assert_eq!(result.path_only(), "/search");
        assert_eq!(result.get_query_param("q").unwrap(), "test");
        assert_eq!(result.get_query_param("flag").unwrap(), "");
        assert_eq!(result.get_query_param("page").unwrap(), "1");
    }

    #[test]
    fn test_malformed_utf8_in_request() {
        let result = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Test: \xFF\xFF\r\n\r\n");
        assert!(matches!(result, Err(Error::MalformedRequestLine(ref s)) if s == "Invalid UTF-8"));
    }

    #[test]
    fn test_body_framing_helpers() {
        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "a".to_string());
        headers.insert("transfer-encoding".to_string(), "gzip, chunked".to_string());
        headers.insert("connection".to_string(), "close".to_string());
        let request = HttpRequest::new(Method::POST, "/up", HttpVersion::Http11, headers);

        assert!(request.is_chunked());
        assert!(!request.keep_alive());
        assert_eq!(request.content_length().unwrap(), None);

        let bad = request.with_header("Content-Length", "ten");
        assert!(matches!(bad.content_length(), Err(Error::InvalidContentLength(_))));
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::GET.to_string(), "GET");
        assert_eq!(Method::PATCH.to_string(), "PATCH");
        assert!(!Method::HEAD.has_response_body());
    }

    fn drain(decoder: &mut ChunkedDecoder, buf: &mut BytesMut) -> (Vec<u8>, bool) {
        let mut data = Vec::new();
        let mut ended = false;
        while let Some(event) = decoder.decode(buf).unwrap() {
            match event {
                ChunkedEvent::Data(bytes) => data.extend_from_slice(&bytes),
                ChunkedEvent::End => {
                    ended = true;
                    break;
                }
            }
        }
        (data, ended)
    }

    #[test]
    fn test_chunked_whole_body() {
        let mut decoder = ChunkedDecoder::new();
        let mut buf = BytesMut::from(&b"5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\nX-Trailer: 1\r\n\r\nNEXT"[..]);
        let (data, ended) = drain(&mut decoder, &mut buf);
        assert_eq!(data, b"hello world");
        assert!(ended);
        assert!(decoder.is_done());
        assert_eq!(&buf[..], b"NEXT");
    }

    #[test]
    fn test_chunked_byte_at_a_time() {
        let wire = b"3\r\nabc\r\na\r\n0123456789\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let mut buf = BytesMut::new();
        let mut data = Vec::new();
        let mut ended = false;
        for byte in wire.iter() {
            buf.extend_from_slice(&[*byte]);
            let (piece, done) = drain(&mut decoder, &mut buf);
            data.extend(piece);
            ended |= done;
        }
        assert_eq!(data, b"abc0123456789");
        assert!(ended);
    }

    #[test]
    fn test_chunked_rejects_bad_size() {
        let mut decoder = ChunkedDecoder::new();
        let mut buf = BytesMut::from(&b"zz\r\n"[..]);
        assert!(matches!(decoder.decode(&mut buf), Err(Error::InvalidChunk(_))));
    }

    #[test]
    fn test_chunked_rejects_missing_crlf() {
        let mut decoder = ChunkedDecoder::new();
        let mut buf = BytesMut::from(&b"2\r\nabXX"[..]);
        assert!(matches!(decoder.decode(&mut buf), Ok(Some(ChunkedEvent::Data(_)))));
        assert!(matches!(decoder.decode(&mut buf), Err(Error::InvalidChunk(_))));
    }
}
