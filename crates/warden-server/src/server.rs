//! HTTP server with graceful shutdown.
//!
//! One Tokio task serves each connection through hyper's HTTP/1 connection
//! driver. Request bodies are collected under the read timeout and capped
//! at the configured size; an oversized body is answered with 413 without
//! running the application. The write timeout is enforced inside the
//! middleware chain by the deadline stage.
//!
//! # Shutdown
//!
//! When the [`ShutdownSignal`] fires the accept loop stops and the listener
//! is closed, so new connections are refused. Every live connection is told
//! to shut down gracefully: in-flight requests finish, then the connection
//! closes. Connections still open after the shutdown timeout are aborted.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_server::{App, Server, ServerConfig, ShutdownSignal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::new(ShutdownSignal::with_os_signals(), global_middleware(metrics, write_timeout));
//!     Server::new(ServerConfig::default(), app).run().await?;
//!     Ok(())
//! }
//! ```

use crate::app::{error_response, App};
use crate::shutdown::ShutdownSignal;
use crate::ServerConfig;
use http::StatusCode;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use warden_core::RemoteAddr;
use warden_middleware::Response;

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
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves an [`App`] over HTTP/1.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    app: Arc<App>,
}

impl Server {
    /// Creates a server for `app`.
    pub fn new(config: ServerConfig, app: App) -> Self {
        Self {
            config,
            app: Arc::new(app),
        }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the application being served.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Binds the configured address and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener).await
    }

    /// Serves connections from an already bound listener until the app's
    /// shutdown signal fires, then drains.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        let shutdown = self.app.shutdown_signal().clone();
        tracing::info!(addr = %local_addr, "server listening");

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            connections.spawn(serve_connection(
                                Arc::clone(&self.app),
                                self.config.clone(),
                                stream,
                                remote_addr,
                                shutdown.clone(),
                            ));
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "connection task failed");
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!(addr = %local_addr, "shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        drop(listener);

        let shutdown_timeout = self.config.shutdown_timeout();
        tracing::info!(
            addr = %local_addr,
            connections = connections.len(),
            timeout = ?shutdown_timeout,
            "waiting for connections to close"
        );

        let drained = tokio::time::timeout(shutdown_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                addr = %local_addr,
                connections = connections.len(),
                "shutdown timeout reached, aborting remaining connections"
            );
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }

        tracing::info!(addr = %local_addr, "server stopped");
        Ok(())
    }
}

/// Drives one connection until it closes or shutdown completes it.
async fn serve_connection(
    app: Arc<App>,
    config: ServerConfig,
    stream: TcpStream,
    remote_addr: SocketAddr,
    shutdown: ShutdownSignal,
) {
    let idle_timeout = config.idle_timeout();
    let config = Arc::new(config);

    let service = service_fn(move |request: http::Request<Incoming>| {
        let app = Arc::clone(&app);
        let config = Arc::clone(&config);
        async move { Ok::<_, Infallible>(handle_request(&app, &config, remote_addr, request).await) }
    });

    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(idle_timeout)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                tracing::debug!(remoteaddr = %remote_addr, error = %e, "connection closed with error");
            }
            return;
        }
        () = shutdown.recv() => {
            tracing::debug!(remoteaddr = %remote_addr, "draining connection");
            conn.as_mut().graceful_shutdown();
        }
    }

    if let Err(e) = conn.await {
        tracing::debug!(remoteaddr = %remote_addr, error = %e, "connection closed with error");
    }
}

/// Collects the body within the size cap, then runs the app.
async fn handle_request(
    app: &App,
    config: &ServerConfig,
    remote_addr: SocketAddr,
    request: http::Request<Incoming>,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = Limited::new(body, config.max_body_bytes());
    let body = match tokio::time::timeout(config.read_timeout(), body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!(
                remoteaddr = %remote_addr,
                limit = config.max_body_bytes(),
                "request body too large"
            );
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
        }
        Ok(Err(e)) => {
            tracing::warn!(remoteaddr = %remote_addr, error = %e, "failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, "unable to read request body");
        }
        Err(_) => {
            tracing::warn!(remoteaddr = %remote_addr, "request body read timed out");
            return error_response(StatusCode::REQUEST_TIMEOUT, "request body read timed out");
        }
    };

    let mut request = http::Request::from_parts(parts, body);
    request.extensions_mut().insert(RemoteAddr(remote_addr));

    app.dispatch(request).await
}
