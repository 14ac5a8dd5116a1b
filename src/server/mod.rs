//! HTTP/1.1 server: accepts connections, frames request bodies and writes
//! responses produced by a [`Router`](crate::router::Router).

mod response;
mod config;
mod error;
mod inbound;
mod http_server;

// Re-export public items
pub use response::{Body, HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::{handle_connection, HttpServer};
