//! # Warden Core
//!
//! Core types shared by every Warden crate.
//!
//! - [`WebError`] - The closed error type the middleware chain classifies
//! - [`RequestContext`] - Per-request trace ID, timing and response status
//! - [`TraceId`] - UUID v7 request identifier
//! - [`PathParams`] - Route parameters captured by the router
//! - [`Validate`] / [`Check`] - Payload field validation

#![doc(html_root_url = "https://docs.rs/warden-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod validate;

pub use context::{PathParams, RemoteAddr, RequestContext, TraceId};
pub use error::{
    is_integrity_failure, ErrorResponse, FieldError, FieldErrors, ShutdownPredicate, WebError,
    WebResult, INTERNAL_ERROR_MESSAGE, VALIDATION_ERROR_MESSAGE,
};
pub use validate::{Check, Validate};
