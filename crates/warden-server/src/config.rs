//! Server configuration types.
//!
//! # Example
//!
//! ```rust
//! use warden_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .addr("127.0.0.1:3000")
//!     .max_body_bytes(64 * 1024)
//!     .build();
//!
//! assert_eq!(config.addr(), "127.0.0.1:3000");
//! assert_eq!(config.max_body_bytes(), 65536);
//! assert_eq!(config.shutdown_timeout(), Duration::from_secs(20));
//! ```

use std::net::SocketAddr;
use std::time::Duration;

/// Default API bind address.
pub const DEFAULT_API_ADDR: &str = "0.0.0.0:3000";

/// Default debug bind address.
pub const DEFAULT_DEBUG_ADDR: &str = "0.0.0.0:4000";

/// Default time allowed to read a request body, in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

/// Default cap on a request body, in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default time an idle keep-alive connection may wait for a request, in
/// seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;

/// Default graceful shutdown timeout, in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 20;

/// Listener configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000")
    addr: String,

    /// Limit on collecting the request body
    read_timeout: Duration,

    /// Largest request body accepted
    max_body_bytes: usize,

    /// Limit on waiting for the next request's headers
    idle_timeout: Duration,

    /// How long in-flight connections get to finish during shutdown
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the bind address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.addr.parse()
    }

    /// Returns the request body read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the request body size cap.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Returns the keep-alive idle timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    addr: String,
    read_timeout: Duration,
    max_body_bytes: usize,
    idle_timeout: Duration,
    shutdown_timeout: Duration,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            addr: DEFAULT_API_ADDR.to_string(),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Sets the request body read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the request body size cap.
    ///
    /// Larger bodies are answered with 413 before the app runs.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Sets the keep-alive idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the graceful shutdown timeout.
    ///
    /// Connections still open when it elapses are aborted.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            read_timeout: self.read_timeout,
            max_body_bytes: self.max_body_bytes,
            idle_timeout: self.idle_timeout,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), DEFAULT_API_ADDR);
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_body_bytes(), 1_048_576);
        assert_eq!(config.idle_timeout(), Duration::from_secs(120));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ServerConfig::builder()
            .addr(DEFAULT_DEBUG_ADDR)
            .read_timeout(Duration::from_millis(100))
            .max_body_bytes(16)
            .idle_timeout(Duration::from_secs(1))
            .shutdown_timeout(Duration::from_secs(3))
            .build();

        assert_eq!(config.addr(), "0.0.0.0:4000");
        assert_eq!(config.read_timeout(), Duration::from_millis(100));
        assert_eq!(config.max_body_bytes(), 16);
        assert_eq!(config.idle_timeout(), Duration::from_secs(1));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::builder().addr("127.0.0.1:3000").build();
        assert_eq!(config.socket_addr().unwrap().port(), 3000);

        let config = ServerConfig::builder().addr("not an address").build();
        assert!(config.socket_addr().is_err());
    }
}
