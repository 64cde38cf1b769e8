//! HTTP server.
//!
//! Accepts TCP connections, serves HTTP/1.1 with Hyper, buffers each request
//! body within the configured limit and timeout, then runs the dispatched
//! pipeline on Tokio's blocking pool. Pipelines are synchronous and their
//! constructors may block, so they never run on the async workers.
//!
//! # Example
//!
//! ```rust,no_run
//! use hermes_core::{standard, Json, Pipeline};
//! use hermes_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hermes_server::ServerError> {
//!     let hello = Pipeline::builder()
//!         .finalizer(standard::respond)
//!         .wrap(|| Json("hello"));
//!
//!     Server::builder()
//!         .http_addr("127.0.0.1:8080")
//!         .build()
//!         .serve(hello)
//!         .await
//! }
//! ```

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::router::Dispatch;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// Response header carrying the request identifier.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Body of the `404 Not Found` response for unmatched requests.
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid address '{addr}': {source}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to the configured address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The Hermes HTTP server.
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
}

impl Server {
    /// Creates a server with the given configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serves until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn serve<D: Dispatch>(self, dispatch: D) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.serve_with_shutdown(dispatch, shutdown).await
    }

    /// Serves until `shutdown` is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn serve_with_shutdown<D: Dispatch>(
        self,
        dispatch: D,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve_listener(listener, dispatch, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown` is
    /// triggered, then waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub async fn serve_listener<D: Dispatch>(
        self,
        listener: TcpListener,
        dispatch: D,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let shutdown_timeout = self.config.shutdown_timeout();
        let max_connections = self.config.max_connections();
        let service = Arc::new(Service {
            config: self.config,
            dispatch,
        });
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            if max_connections.is_some_and(|max| tracker.active_connections() >= max) {
                                tracing::warn!(%remote_addr, "connection limit reached, dropping connection");
                                drop(stream);
                            } else {
                                let service = Arc::clone(&service);
                                let token = tracker.acquire();
                                let shutdown = shutdown.clone();

                                tokio::spawn(async move {
                                    if let Err(err) = handle_connection(service, stream, remote_addr, shutdown).await {
                                        tracing::error!(%remote_addr, error = %err, "connection error");
                                    }
                                    drop(token);
                                });
                            }
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to accept connection");
                        }
                    }
                }

                _ = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!(
            active = tracker.active_connections(),
            timeout_secs = shutdown_timeout.as_secs(),
            "waiting for connections to close"
        );

        tokio::select! {
            _ = tracker.wait_idle() => {
                tracing::info!("all connections closed");
            }
            _ = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }

    /// Handles one request without a socket.
    pub async fn handle<D, B>(&self, dispatch: &D, request: Request<B>) -> HttpResponse
    where
        D: Dispatch + ?Sized,
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        handle_request(&self.config, dispatch, request).await
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

struct Service<D> {
    config: ServerConfig,
    dispatch: D,
}

async fn handle_connection<D: Dispatch>(
    service: Arc<Service<D>>,
    stream: TcpStream,
    remote_addr: SocketAddr,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);

    let hyper_service = service_fn(move |request: Request<Incoming>| {
        let service = Arc::clone(&service);
        async move {
            Ok::<_, Infallible>(handle_request(&service.config, &service.dispatch, request).await)
        }
    });

    let connection = http1::Builder::new().serve_connection(io, hyper_service);
    tokio::pin!(connection);

    tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown.recv() => {
            tracing::debug!(%remote_addr, "closing connection for shutdown");
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    }
}

async fn handle_request<D, B>(config: &ServerConfig, dispatch: &D, request: Request<B>) -> HttpResponse
where
    D: Dispatch + ?Sized,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let request_id = Uuid::now_v7();
    let started = Instant::now();
    let span = tracing::info_span!(
        "request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let mut response = dispatch_request(config, dispatch, request).await;

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        tracing::debug!(
            status = response.status().as_u16(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}

async fn dispatch_request<D, B>(config: &ServerConfig, dispatch: &D, request: Request<B>) -> HttpResponse
where
    D: Dispatch + ?Sized,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = request.into_parts();

    let Some(matched) = dispatch.dispatch(&parts.method, parts.uri.path()) else {
        tracing::debug!("no pipeline for request");
        return text_response(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
    };

    let body = match collect_body(body, config.max_body_bytes(), config.request_timeout()).await {
        Ok(body) => body,
        Err(response) => return response,
    };

    let (pipeline, params) = matched.into_parts();
    let request =
        hermes_core::Request::new(parts.method, parts.uri, parts.headers, body).with_segments(params);

    let span = tracing::Span::current();
    let outcome = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        pipeline.serve_request(request)
    })
    .await;

    match outcome {
        Ok(response) => response.map(Full::new),
        Err(err) => {
            tracing::error!(error = %err, "pipeline task failed");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error\n")
        }
    }
}

async fn collect_body<B>(body: B, limit: usize, timeout: Duration) -> Result<Bytes, HttpResponse>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match tokio::time::timeout(timeout, Limited::new(body, limit).collect()).await {
        Ok(Ok(collected)) => Ok(collected.to_bytes()),
        Ok(Err(err)) if err.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::debug!(limit, "request body too large");
            Err(text_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large\n"))
        }
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "failed to read request body");
            Err(text_response(StatusCode::BAD_REQUEST, "failed to read request body\n"))
        }
        Err(_) => {
            tracing::warn!(timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX), "request body timed out");
            Err(text_response(StatusCode::REQUEST_TIMEOUT, "request body timed out\n"))
        }
    }
}

fn text_response(status: StatusCode, body: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(hermes_core::TEXT_PLAIN),
    );
    response
}

/// Builder for [`Server`].
///
/// # Example
///
/// ```rust
/// use hermes_server::Server;
/// use std::time::Duration;
///
/// let server = Server::builder()
///     .http_addr("0.0.0.0:9090")
///     .shutdown_timeout(Duration::from_secs(60))
///     .build();
///
/// assert_eq!(server.config().http_addr(), "0.0.0.0:9090");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServerBuilder {
    config: ServerConfig,
}

impl ServerBuilder {
    /// Starts from [`ServerConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting with `config`.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config = self.config.with_http_addr(addr);
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_shutdown_timeout(timeout);
        self
    }

    /// Sets the time allowed for reading a request body.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_request_timeout(timeout);
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config = self.config.with_max_body_bytes(max);
        self
    }

    /// Sets the maximum concurrent connections.
    #[must_use]
    pub fn max_connections(mut self, max: Option<usize>) -> Self {
        self.config = self.config.with_max_connections(max);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server::new(self.config)
    }
}
