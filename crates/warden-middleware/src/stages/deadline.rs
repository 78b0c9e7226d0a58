//! Write deadline middleware.
//!
//! Runs inside Logger, Errors and Metrics, so a request that overruns is
//! still counted, rendered as JSON and logged with its final status. The
//! inner chain's future is dropped when the deadline passes; the handler
//! does not keep running in the background.

use crate::{
    middleware::{BoxFuture, Middleware, Next},
    types::{HandlerResult, Request},
};
use http::StatusCode;
use std::time::Duration;
use warden_core::{RequestContext, WebError};

/// Message sent with the 503 for an overrun request.
pub const DEADLINE_EXCEEDED_MESSAGE: &str = "request timed out";

/// Cancels the inner chain after `timeout` and answers 503.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    timeout: Duration,
}

impl Deadline {
    /// Creates the middleware.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The configured limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Middleware for Deadline {
    fn name(&self) -> &'static str {
        "deadline"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let trace_id = ctx.trace_id();
            match tokio::time::timeout(self.timeout, next.run(ctx, request)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        trace_id = %trace_id,
                        timeout = ?self.timeout,
                        "request cancelled after write timeout"
                    );
                    Err(WebError::request(
                        StatusCode::SERVICE_UNAVAILABLE,
                        DEADLINE_EXCEEDED_MESSAGE,
                    ))
                }
            }
        })
    }
}
