//! Request logging middleware.
//!
//! Logs one line when a request arrives and one when it leaves. The
//! completion line reads the status from the request context, which the
//! handler or the errors middleware has written by the time the inner chain
//! returns, so it must sit outside the errors middleware.

use crate::{
    middleware::{BoxFuture, Middleware, Next},
    types::{HandlerResult, Request},
};
use warden_core::{RemoteAddr, RequestContext};

/// Logs request start and completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Logger {
    /// Creates the logger middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for Logger {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request
                .uri()
                .path_and_query()
                .map_or_else(|| request.uri().path().to_string(), ToString::to_string);
            let remote_addr = request
                .extensions()
                .get::<RemoteAddr>()
                .map(ToString::to_string)
                .unwrap_or_default();

            tracing::info!(
                trace_id = %ctx.trace_id(),
                method = %method,
                path = %path,
                remoteaddr = %remote_addr,
                "request started"
            );

            let result = next.run(ctx, request).await;

            tracing::info!(
                trace_id = %ctx.trace_id(),
                method = %method,
                path = %path,
                remoteaddr = %remote_addr,
                statuscode = ctx.status_code().map_or(0, |status| status.as_u16()),
                since = ?ctx.elapsed(),
                "request completed"
            );

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chain;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use warden_core::WebError;

    #[tokio::test]
    async fn test_logger_passes_result_through() {
        let chain = Chain::new(|_req: Request| async {
            let mut response = http::Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::ACCEPTED;
            Ok::<_, WebError>(response)
        })
        .with(Logger::new());

        let request = http::Request::builder()
            .uri("/v1/test?page=2")
            .body(Bytes::new())
            .unwrap();
        let mut ctx = RequestContext::new();
        let response = chain.run(&mut ctx, request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(ctx.status_code(), Some(StatusCode::ACCEPTED));
    }
}
