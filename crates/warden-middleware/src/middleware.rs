//! Core middleware and handler traits.
//!
//! A [`Middleware`] wraps everything inside it: it receives the request
//! context, the request and a [`Next`] that runs the rest of the chain. It
//! may act before and after calling `next.run()`, or return early without
//! calling it at all.
//!
//! # Example
//!
//! ```ignore
//! use warden_middleware::{BoxFuture, HandlerResult, Middleware, Next, Request};
//! use warden_core::RequestContext;
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             let result = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "inner chain done");
//!             result
//!         })
//!     }
//! }
//! ```

use crate::types::{HandlerResult, Request};
use std::future::Future;
use std::pin::Pin;
use warden_core::RequestContext;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A layer of the chain.
///
/// # Invariants
///
/// - Middleware calls `next.run()` at most once
/// - Middleware that short-circuits returns an `Err` rather than writing a
///   response itself, so only the errors layer renders failures
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs and by [`Chain::names`](crate::Chain::names).
    fn name(&self) -> &'static str;

    /// Processes the request, usually by delegating to `next`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult>;
}

/// The endpoint at the center of a chain.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = HandlerResult>`,
/// so plain async closures work as handlers.
pub trait Handler: Send + Sync + 'static {
    /// Handles the request.
    fn call(&self, request: Request) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(request))
    }
}

/// Runs the remainder of the chain.
///
/// Consumed by [`Next::run`], so it can only be called once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More middleware to process.
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain.
    Handler(&'a dyn Handler),
}

impl<'a> Next<'a> {
    /// Wraps `next` in `middleware`.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Terminal `Next` that invokes the handler.
    pub(crate) fn handler(handler: &'a dyn Handler) -> Self {
        Self {
            inner: NextInner::Handler(handler),
        }
    }

    /// Invokes the next middleware or the handler.
    ///
    /// When the handler produces a response its status is recorded in the
    /// context before the result travels back out.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> HandlerResult {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::Handler(handler) => {
                let result = handler.call(request).await;
                if let Ok(response) = &result {
                    ctx.set_status_code(response.status());
                }
                result
            }
        }
    }
}
