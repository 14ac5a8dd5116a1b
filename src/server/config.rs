//! Server configuration.

use std::net::SocketAddr;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// How many bytes to ask the socket for per read. Also the largest
    /// body chunk handed to a reader.
    pub read_buffer_size: usize,
    /// Largest request head accepted before answering 431.
    pub max_head_size: usize,
    /// Serve further requests on a connection after the first.
    pub keep_alive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1024,
            read_buffer_size: 8192,
            max_head_size: 16 * 1024,
            keep_alive: true,
        }
    }
}
