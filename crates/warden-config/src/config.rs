//! Configuration sections.
//!
//! Every section deserializes with defaults for missing fields and rejects
//! unknown ones.

use crate::ConfigError;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use warden_telemetry::LogConfig;

/// Complete Warden service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use warden_config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert_eq!(config.web.api_host, "0.0.0.0:3000");
/// assert_eq!(config.auth.issuer, "service project");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Listener settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Token and key settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl WardenConfig {
    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_addr("web.api_host", &self.web.api_host)?;
        parse_addr("web.debug_host", &self.web.debug_host)?;

        for (field, secs) in [
            ("web.read_timeout_secs", self.web.read_timeout_secs),
            ("web.write_timeout_secs", self.web.write_timeout_secs),
            ("web.idle_timeout_secs", self.web.idle_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::invalid_value(field, "must be greater than zero"));
            }
        }
        if self.web.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "web.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.auth.active_kid.trim().is_empty() {
            return Err(ConfigError::invalid_value("auth.active_kid", "must not be empty"));
        }
        if self.auth.issuer.trim().is_empty() {
            return Err(ConfigError::invalid_value("auth.issuer", "must not be empty"));
        }

        Ok(())
    }
}

fn parse_addr(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid_value(field, format!("invalid socket address: {value}")))
}

/// Listener settings for the API and debug servers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebConfig {
    /// API bind address.
    pub api_host: String,
    /// Debug bind address.
    pub debug_host: String,
    /// Limit on reading a request body.
    pub read_timeout_secs: u64,
    /// Limit on producing a response.
    pub write_timeout_secs: u64,
    /// Limit on an idle keep-alive connection.
    pub idle_timeout_secs: u64,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
    /// Time in-flight requests get to finish on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0:3000".to_string(),
            debug_host: "0.0.0.0:4000".to_string(),
            read_timeout_secs: 5,
            write_timeout_secs: 10,
            idle_timeout_secs: 120,
            max_body_bytes: 1024 * 1024,
            shutdown_timeout_secs: 20,
        }
    }
}

impl WebConfig {
    /// Read timeout as a `Duration`.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Write timeout as a `Duration`.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Idle timeout as a `Duration`.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Shutdown timeout as a `Duration`.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Key material and token settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Directory holding `<kid>.pem` and `<kid>.pub.pem` files.
    pub keys_folder: PathBuf,
    /// Key id used to sign new tokens.
    pub active_kid: String,
    /// `iss` claim for issued tokens.
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keys_folder: PathBuf::from("zarf/keys/"),
            active_kid: "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1".to_string(),
            issuer: "service project".to_string(),
        }
    }
}

/// Logging and metrics export settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Log subscriber settings.
    pub logging: LogConfig,
    /// Install the Prometheus recorder and serve `/metrics`.
    pub prometheus: bool,
    /// Build identifier reported by the liveness endpoint.
    pub build: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            logging: LogConfig::default(),
            prometheus: true,
            build: "develop".to_string(),
        }
    }
}
