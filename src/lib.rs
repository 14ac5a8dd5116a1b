//! A streaming request pipeline for a small embedded HTTP server.
//!
//! Requests flow through four stages:
//!
//! - [`parser`] reads request heads and decodes chunked framing.
//! - [`router`] matches method and path templates, then runs the handler
//!   inside an onion-ordered chain of filters.
//! - [`body`] negotiates per request which codec turns the body into typed
//!   values and which one turns the handler's result back into bytes.
//! - [`stream`] decodes JSON incrementally from chunks of any size, one
//!   value at a time and only as fast as the handler asks for them.
//!
//! [`server`] ties them to tokio sockets.
//!
//! # Examples
//!
//! ## Routing
//!
//! ```
//! use microhttp_flow::{HttpResponse, RequestContext, Router, RouterError, StatusCode};
//!
//! async fn hello(ctx: RequestContext) -> Result<RequestContext, RouterError> {
//!     let name = ctx.path_param("name").unwrap_or("World").to_string();
//!     let response = HttpResponse::new(StatusCode::Ok).with_body_string(format!("Hello, {name}!"));
//!     Ok(ctx.respond(response))
//! }
//!
//! let mut router = Router::new();
//! router.get("/hello/{name}", hello).unwrap();
//! assert!(router.find(microhttp_flow::Method::GET, "/hello/you").is_some());
//! ```
//!
//! ## Parsing a request head
//!
//! ```
//! use microhttp_flow::{parse_request_head, ParserError};
//!
//! let input = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! match parse_request_head(input) {
//!     Ok(Some((request, consumed))) => {
//!         assert_eq!(request.path, "/index.html");
//!         assert_eq!(consumed, input.len());
//!     }
//!     Ok(None) => println!("need more bytes"),
//!     Err(ParserError::InvalidMethod(method)) => println!("Invalid method: {method}"),
//!     Err(err) => println!("Other error: {err}"),
//! }
//! ```
//!
//! ## Reading a streamed body
//!
//! ```
//! use futures::executor::block_on;
//! use futures::stream::TryStreamExt;
//! use microhttp_flow::body::{self, Chunk};
//! use microhttp_flow::{HttpRequest, HttpVersion, Method, RequestContext};
//!
//! let request = HttpRequest::new(Method::POST, "/", HttpVersion::Http11, Default::default());
//! let chunks = vec![Chunk::new("[1, 2"), Chunk::new("0, 3]")];
//! let mut ctx = RequestContext::from_request(request).with_body(body::from_chunks(chunks));
//!
//! let numbers: Vec<u32> = block_on(ctx.read_stream::<u32>().unwrap().try_collect()).unwrap();
//! assert_eq!(numbers, vec![1, 20, 3]);
//! ```
//!
//! See `demos/json_stream.rs` for a complete server.

pub mod parser;
pub mod router;
pub mod body;
pub mod stream;
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{parse_request_head, Error as ParserError, HttpRequest, HttpVersion, Method};
pub use router::{Error as RouterError, Filter, Handler, Next, PathSpec, RequestContext, Router};
pub use body::{BodyInterchange, BodyStream, Chunk, Entity, Error as BodyError, TypeInfo};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ServerConfig, StatusCode};
