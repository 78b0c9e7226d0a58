//! Structured logging and request metrics for Warden.
//!
//! - **Logging**: JSON or pretty output through `tracing-subscriber`
//! - **Metrics**: atomic request/error/panic counters, mirrored to Prometheus
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_telemetry::{init_logging, init_metrics, LogConfig, Metrics};
//!
//! init_logging(&LogConfig::default())?;
//! init_metrics()?;
//!
//! let metrics = Arc::new(Metrics::new());
//! metrics.add_requests();
//! ```
//!
//! # Metrics Endpoint
//!
//! The debug listener exposes `/metrics` in Prometheus text format:
//!
//! ```text
//! # HELP warden_requests_total Total number of requests handled
//! # TYPE warden_requests_total counter
//! warden_requests_total 1234
//! ```

#![warn(missing_docs)]

mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics, Metrics, MetricsSnapshot, TASK_SAMPLE_INTERVAL};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
