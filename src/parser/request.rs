//! HTTP request head parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// The head of an HTTP request: request line and headers.
///
/// The body is not part of this type. It arrives separately as a lazy
/// sequence of chunks (see [`crate::body::BodyStream`]).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// Query parameters parsed from the path
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a new request head.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `path` - The request target; any query string is parsed into `query_params`
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers
    ///
    /// # Returns
    ///
    /// A request head with no body attached
    pub fn new(method: Method, path: impl Into<String>, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let path = path.into();
        let query_params: HashMap<String, String> = path
            .split_once('?')
            .map(|(_, query)| query
                .split('&')
                .filter(|s| !s.is_empty())
                .map(|pair| {
                    if let Some((k, v)) = pair.split_once('=') {
                        (k.to_string(), v.to_string())
                    } else {
                        (pair.to_string(), String::new())
                    }
                })
                .collect())
            .unwrap_or_default();

        Self {
            method,
            path,
            version,
            headers,
            query_params,
        }
    }

    /// Add or replace a header. Mostly useful when building requests in tests.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The path without its query string.
    pub fn path_only(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(path, _)| path)
    }

    /// Get a header value.
    ///
    /// # Arguments
    ///
    /// * `name` - The header name, matched case-insensitively
    ///
    /// # Returns
    ///
    /// The header value, if it exists
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    ///
    /// # Arguments
    ///
    /// * `name` - The header name
    ///
    /// # Returns
    ///
    /// true if the header exists, false otherwise
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// The Content-Type header, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("Content-Type").map(String::as_str)
    }

    /// The Accept header, if any.
    pub fn accept(&self) -> Option<&str> {
        self.get_header("Accept").map(String::as_str)
    }

    /// The declared body length.
    ///
    /// # Returns
    ///
    /// `Ok(None)` without a Content-Length header, or
    /// [`Error::InvalidContentLength`] if its value is not a number
    pub fn content_length(&self) -> Result<Option<u64>, Error> {
        match self.get_header("Content-Length") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Error::InvalidContentLength(value.clone())),
            None => Ok(None),
        }
    }

    /// Whether the body uses chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        self.get_header("Transfer-Encoding")
            .map(|te| te.split(',').any(|coding| coding.trim().eq_ignore_ascii_case("chunked")))
            .unwrap_or(false)
    }

    /// Whether the connection should stay open after the response.
    pub fn keep_alive(&self) -> bool {
        match self.get_header("Connection") {
            Some(value) if value.eq_ignore_ascii_case("close") => false,
            Some(value) if value.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version.keeps_alive_by_default(),
        }
    }

    /// Get a query parameter value.
    ///
    /// # Arguments
    ///
    /// * `name` - The query parameter name
    ///
    /// # Returns
    ///
    /// The parameter value, if it exists
    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }
}

/// Parse a request head from the front of `input`.
///
/// # Arguments
///
/// * `input` - The bytes read from the connection so far
///
/// # Returns
///
/// * `Ok(None)` while the blank line that terminates the head has not arrived yet
/// * `Ok(Some((request, consumed)))` once it has; bytes past `consumed` belong to the body
/// * `Err` if the request line or a header is malformed
pub fn parse_request_head(input: &[u8]) -> Result<Option<(HttpRequest, usize)>, Error> {
    let head_len = match find_head_end(input) {
        Some(end) => end,
        None => return Ok(None),
    };

    let head = match std::str::from_utf8(&input[..head_len]) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) if !line.is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let path = parts[1];
    if !path.starts_with('/') && path != "*" {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or(Error::InvalidHeaderFormat)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeaderFormat);
        }
        headers.insert(name.to_string(), value.trim().to_string());
    }

    if version == HttpVersion::Http11 && !headers.keys().any(|k| k.eq_ignore_ascii_case("Host")) {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    Ok(Some((HttpRequest::new(method, path, version, headers), head_len)))
}

/// Offset just past the `\r\n\r\n` that ends the head.
fn find_head_end(input: &[u8]) -> Option<usize> {
    input
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}
