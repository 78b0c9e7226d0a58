//! Layered configuration for the Warden service.
//!
//! [`WardenConfig`] has three sections:
//!
//! - [`WebConfig`] - API and debug bind addresses, timeouts and body limit
//! - [`AuthConfig`] - key folder, active key id and token issuer
//! - [`TelemetryConfig`] - logging, Prometheus export and build id
//!
//! # Configuration File Format
//!
//! ```toml
//! [web]
//! api_host = "0.0.0.0:3000"
//! debug_host = "0.0.0.0:4000"
//! read_timeout_secs = 5
//! write_timeout_secs = 10
//! idle_timeout_secs = 120
//! max_body_bytes = 1048576
//! shutdown_timeout_secs = 20
//!
//! [auth]
//! keys_folder = "zarf/keys/"
//! active_kid = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1"
//! issuer = "service project"
//!
//! [telemetry]
//! prometheus = true
//! build = "develop"
//!
//! [telemetry.logging]
//! level = "info"
//! json_format = true
//! ```
//!
//! # Environment Variable Overrides
//!
//! With a prefix of `WARDEN`, `WARDEN__WEB__API_HOST=0.0.0.0:8000` overrides
//! `web.api_host`. Nested keys add another `__` segment, as in
//! `WARDEN__TELEMETRY__LOGGING__LEVEL=debug`.

mod config;
mod error;
mod loader;

pub use config::{AuthConfig, TelemetryConfig, WardenConfig, WebConfig};
pub use error::ConfigError;
pub use loader::ConfigLoader;
