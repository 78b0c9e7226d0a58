//! # Warden Server
//!
//! HTTP server infrastructure for Warden:
//!
//! - [`App`] - binds routes to composed middleware chains
//! - [`Mux`] - method and path router with `{param}` capture
//! - [`Server`] - HTTP/1 listener with body read timeout and size cap
//! - [`ShutdownSignal`] - one-shot, process-wide graceful shutdown
//! - [`debug_app`] - metrics, readiness and liveness endpoints
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_server::{App, Server, ServerConfig, ShutdownSignal};
//! use std::time::Duration;
//! use warden_middleware::global_middleware;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let shutdown = ShutdownSignal::with_os_signals();
//!     let mut app = App::new(shutdown, global_middleware(metrics, Duration::from_secs(10)));
//!     app.handle(Method::GET, "/v1/test", test, vec![]);
//!
//!     Server::new(ServerConfig::default(), app).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/warden-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod config;
mod debug;
pub mod mux;
mod server;
pub mod shutdown;

pub use app::App;
pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_API_ADDR, DEFAULT_DEBUG_ADDR,
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_BODY_BYTES, DEFAULT_READ_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use debug::{debug_app, Liveness, Readiness};
pub use mux::{Mux, RouteLookup};
pub use server::{Server, ServerError};
pub use shutdown::ShutdownSignal;
