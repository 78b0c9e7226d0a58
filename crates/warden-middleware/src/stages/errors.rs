//! Error translation middleware.
//!
//! The only place a [`WebError`] becomes an HTTP response. Everything the
//! inner chain returns as `Err` is logged with full detail and answered with
//! the body [`WebError::to_response_body`] chooses:
//!
//! | Error | Status | Body |
//! |---|---|---|
//! | `Validation` | 400 | `{"error": "data validation error", "fields": {..}}` |
//! | `Request` | chosen | `{"error": message}` |
//! | `Unauthorized` | 401 | `{"error": "Unauthorized"}` |
//! | `Forbidden` | 403 | `{"error": "Forbidden"}` |
//! | anything else | 500 | `{"error": "Internal Server Error"}` |
//!
//! Shutdown errors are still answered but also returned, so the application
//! adapter can begin a graceful shutdown.

use crate::{
    middleware::{BoxFuture, Middleware, Next},
    response::respond,
    types::{bare_response, HandlerResult, Request},
};
use http::StatusCode;
use warden_core::{RequestContext, WebError};

/// Converts errors into responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Errors;

impl Errors {
    /// Creates the errors middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn log(ctx: &RequestContext, err: &WebError) {
        match err {
            WebError::Panic { message, backtrace } => {
                tracing::error!(
                    trace_id = %ctx.trace_id(),
                    panic = %message,
                    backtrace = %backtrace,
                    "handler panicked"
                );
            }
            err if err.status_code().is_server_error() => {
                tracing::error!(trace_id = %ctx.trace_id(), error = ?err, "request failed");
            }
            err => {
                tracing::info!(trace_id = %ctx.trace_id(), error = %err, "request rejected");
            }
        }
    }
}

impl Middleware for Errors {
    fn name(&self) -> &'static str {
        "errors"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let err = match next.run(ctx, request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            Self::log(ctx, &err);

            let status = err.status_code();
            match respond(&err.to_response_body(), status) {
                Ok(response) => {
                    ctx.set_status_code(status);
                    if err.is_shutdown() {
                        return Err(err);
                    }
                    Ok(response)
                }
                Err(build_err) => {
                    ctx.set_status_code(StatusCode::INTERNAL_SERVER_ERROR);
                    if err.is_shutdown() {
                        return Err(err);
                    }
                    tracing::error!(
                        trace_id = %ctx.trace_id(),
                        error = ?build_err,
                        "building error response"
                    );
                    Ok(bare_response(StatusCode::INTERNAL_SERVER_ERROR))
                }
            }
        })
    }
}
