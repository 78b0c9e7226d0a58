//! # Warden Middleware
//!
//! The composable middleware chain every Warden endpoint runs behind.
//!
//! ## Chain
//!
//! ```text
//! Request → Logger → Errors → Metrics → Deadline → Panics → [Authenticate → Authorize] → Handler
//!                                                                                         ↓
//! Response ← Logger ← Errors ← Metrics ← Deadline ← Panics ←──────────────────────────────┘
//! ```
//!
//! | Stage | Scope | Purpose |
//! |-------|-------|---------|
//! | Logger | global | `request started` / `request completed` logs |
//! | Errors | global | Translate `WebError` into a JSON response |
//! | Metrics | global | Count requests and errors, sample live tasks |
//! | Deadline | global | Cancel the inner chain after the write timeout |
//! | Panics | global | Recover panics into `WebError::Panic` |
//! | Authenticate | route | Verify the bearer token, store `Claims` |
//! | Authorize | route | Evaluate a policy rule against `Claims` |
//!
//! Handlers and middleware return [`HandlerResult`]; only the errors stage
//! renders failures, so everything inside it just returns `Err`.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden_middleware::{global_middleware, Chain};
//! use warden_telemetry::Metrics;
//!
//! let global = global_middleware(Arc::new(Metrics::new()), Duration::from_secs(10));
//! let names: Vec<_> = global.iter().map(|mw| mw.name()).collect();
//! assert_eq!(names, ["logger", "errors", "metrics", "deadline", "panics"]);
//! ```

#![doc(html_root_url = "https://docs.rs/warden-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod middleware;
pub mod response;
pub mod stages;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

// Re-export main types at crate root
pub use chain::Chain;
pub use middleware::{BoxFuture, Handler, Middleware, Next};
pub use response::{decode, param, respond};
pub use types::{bare_response, HandlerResult, Request, Response};

/// The standard global stack, outermost first: logger, errors, metrics,
/// deadline, panics.
///
/// `write_timeout` bounds everything inside the metrics stage, so an
/// overrun request is still counted and logged.
pub fn global_middleware(
    metrics: Arc<warden_telemetry::Metrics>,
    write_timeout: Duration,
) -> Vec<Arc<dyn Middleware>> {
    vec![
        Arc::new(stages::Logger::new()),
        Arc::new(stages::Errors::new()),
        Arc::new(stages::Metrics::new(Arc::clone(&metrics))),
        Arc::new(stages::Deadline::new(write_timeout)),
        Arc::new(stages::Panics::new(metrics)),
    ]
}
