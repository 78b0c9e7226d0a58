//! Request counting middleware.

use crate::{
    middleware::{BoxFuture, Middleware, Next},
    types::{HandlerResult, Request},
};
use std::sync::Arc;
use warden_core::RequestContext;
use warden_telemetry::Metrics as Counters;

/// Counts every request and every request that fails.
///
/// Every 100th request also samples the live task count.
#[derive(Debug, Clone)]
pub struct Metrics {
    counters: Arc<Counters>,
}

impl Metrics {
    /// Creates the middleware over shared counters.
    #[must_use]
    pub fn new(counters: Arc<Counters>) -> Self {
        Self { counters }
    }
}

impl Middleware for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let result = next.run(ctx, request).await;

            let count = self.counters.add_requests();
            self.counters.sample_tasks(count);
            if result.is_err() {
                self.counters.add_errors();
            }

            result
        })
    }
}
