//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::body::BodyInterchange;
use crate::parser::Error as ParserError;
use crate::router::{RequestContext, Router};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::inbound::Inbound;
use crate::server::response::{Body, HttpResponse, StatusCode};

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    router: Arc<Router>,
    interchange: Arc<BodyInterchange>,
}

impl HttpServer {
    /// Create a new HTTP server serving `router` with the default codecs.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
            interchange: Arc::new(BodyInterchange::default()),
        }
    }

    /// Replace the body codecs used for every request.
    pub fn with_interchange(mut self, interchange: BodyInterchange) -> Self {
        self.interchange = Arc::new(interchange);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Log the registered endpoints and codecs.
    fn display_server_info(&self) {
        info!("Registered endpoints:");
        for route in self.router.routes() {
            info!("  {route}");
        }
        for filter in self.router.filters() {
            debug!("  filter {filter}");
        }
        debug!(
            "Body readers: {:?}, writers: {:?}",
            self.interchange.reader_names(),
            self.interchange.writer_names()
        );
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: mpsc::Sender<()>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// Handle a new connection.
    fn handle_new_connection(&self, mut socket: tokio::net::TcpStream, addr: SocketAddr, semaphore: &Arc<Semaphore>, tasks: &mut JoinSet<()>) {
        // Try to acquire a permit from the semaphore
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                tasks.spawn(async move {
                    let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                        .with_content_type("text/plain")
                        .with_header("Connection", "close")
                        .with_body_string("Server is at capacity, please try again later");
                    let _ = write_response(&mut socket, response, true).await;
                });
                return;
            }
        };

        let router = self.router.clone();
        let interchange = self.interchange.clone();
        let config = self.config.clone();

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;
            debug!("Accepted connection from {addr}");

            if let Err(e) = handle_connection(socket, router, interchange, &config).await {
                warn!("Connection from {addr} ended with an error: {e}");
            }
        });
    }

    /// Handle connection errors. Returns `true` when accepting should stop.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let drained = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("Shutdown timed out, aborting {len} connections", len = tasks.len());
            tasks.abort_all();
        }

        info!("Server shutdown complete");
    }

    /// Start the server and listen for incoming connections.
    pub async fn start(&self) -> Result<(), Error> {
        self.display_server_info();

        let listener = self.setup_listener().await?;
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut tasks = JoinSet::new();

        Self::setup_ctrl_c_handler(shutdown_tx, &mut tasks);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => self.handle_new_connection(socket, addr, &semaphore, &mut tasks),
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }

            // reap finished connections so the set does not grow unbounded
            while tasks.try_join_next().is_some() {}
        }

        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }
}

/// Serve requests on one connection until the peer closes it, keep-alive
/// ends, or an unrecoverable error occurs.
///
/// Requests are answered strictly one after another, so pipelined
/// requests get their responses in order. A request's body is read only
/// when the handler asks for it; whatever it leaves unread is skipped
/// before the next request head is parsed.
pub async fn handle_connection<S>(io: S, router: Arc<Router>, interchange: Arc<BodyInterchange>, config: &ServerConfig) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(io);
    let inbound = Arc::new(Mutex::new(Inbound::new(reader, config.read_buffer_size)));

    loop {
        let head = inbound.lock().await.read_head(config.max_head_size).await;
        let request = match head {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(Error::ParseError(err)) => return reject(&mut writer, err).await,
            Err(err) => return Err(err),
        };
        if let Err(err) = inbound.lock().await.start_body(&request) {
            return reject(&mut writer, err).await;
        }

        let keep_alive = config.keep_alive && request.keep_alive();
        let send_body = request.method.has_response_body();
        debug!("{} {}", request.method, request.path);

        let body = Inbound::body_stream(inbound.clone());
        let ctx = RequestContext::new(request, body, interchange.clone());
        let mut response = match router.dispatch(ctx).await {
            Ok(ctx) => ctx.into_response(),
            Err(err) => {
                warn!("Request failed: {err}");
                HttpResponse::new(err.status())
                    .with_content_type("text/plain")
                    .with_body_string(err.to_string())
            }
        };
        if !keep_alive {
            response.set_header("Connection", "close");
        }

        write_response(&mut writer, response, send_body).await?;

        if !keep_alive {
            writer.shutdown().await?;
            return Ok(());
        }
        inbound.lock().await.discard_body().await?;
    }
}

/// Answer a request whose head or framing could not be parsed, then close.
async fn reject<W>(writer: &mut W, err: ParserError) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let status = match err {
        ParserError::HeadTooLarge(_) => StatusCode::RequestHeaderFieldsTooLarge,
        _ => StatusCode::BadRequest,
    };
    let response = HttpResponse::new(status)
        .with_content_type("text/plain")
        .with_header("Connection", "close")
        .with_body_string(format!("Error parsing request: {err}"));
    write_response(writer, response, true).await?;
    writer.shutdown().await?;
    Err(Error::ParseError(err))
}

/// Write `response`, sending streamed bodies with chunked framing.
///
/// If a streamed body fails after the head is out, the response cannot be
/// completed; the error is returned and the caller drops the connection.
async fn write_response<W>(writer: &mut W, response: HttpResponse, send_body: bool) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.head_bytes()).await?;
    match response.body {
        Body::Empty => {}
        Body::Full(bytes) => {
            if send_body {
                writer.write_all(&bytes).await?;
            }
        }
        Body::Stream(mut chunks) => {
            if send_body {
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk?;
                    // a zero-length chunk would end the body early
                    if chunk.is_empty() {
                        continue;
                    }
                    writer.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await?;
                    writer.write_all(&chunk).await?;
                    writer.write_all(b"\r\n").await?;
                }
                writer.write_all(b"0\r\n\r\n").await?;
            }
        }
    }
    writer.flush().await?;
    Ok(())
}
