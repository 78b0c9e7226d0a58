//! Middleware stages.
//!
//! ## Global (every route, outermost first)
//!
//! 1. [`Logger`] - request start/completion logs
//! 2. [`Errors`] - `WebError` to JSON response
//! 3. [`Metrics`] - request, error and task counters
//! 4. [`Deadline`] - write timeout, answered with 503
//! 5. [`Panics`] - panic recovery
//!
//! ## Route
//!
//! - [`Authenticate`] - bearer token verification
//! - [`Authorize`] - policy rule evaluation

pub mod auth;
pub mod deadline;
pub mod errors;
pub mod logger;
pub mod metrics;
pub mod panics;

pub use auth::{Authenticate, Authorize};
pub use deadline::{Deadline, DEADLINE_EXCEEDED_MESSAGE};
pub use errors::Errors;
pub use logger::Logger;
pub use metrics::Metrics;
pub use panics::Panics;
