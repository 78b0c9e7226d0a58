//! The application adapter between the router and the middleware chain.
//!
//! [`App`] owns a [`Mux`] and delegates route storage to it. Each
//! registration composes the handler with its route middleware and the
//! application's global middleware into a single [`Chain`]. At request time
//! the adapter creates the [`RequestContext`], runs the chain, and turns any
//! error that escaped it into a generic 500, triggering shutdown first when
//! the error matches the shutdown predicate.

use crate::mux::{Mux, RouteLookup};
use crate::shutdown::ShutdownSignal;
use http::{header, HeaderValue, Method, StatusCode};
use std::sync::Arc;
use warden_core::{
    is_integrity_failure, ErrorResponse, RequestContext, ShutdownPredicate, INTERNAL_ERROR_MESSAGE,
};
use warden_middleware::{bare_response, respond, Chain, Handler, Middleware, Request, Response};

/// Builds a JSON error response, falling back to an empty body.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    respond(&ErrorResponse::new(message), status).unwrap_or_else(|_| bare_response(status))
}

/// Routes requests through composed middleware chains.
///
/// # Example
///
/// ```rust,ignore
/// let global = global_middleware(metrics, Duration::from_secs(10));
/// let mut app = App::new(ShutdownSignal::with_os_signals(), global);
///
/// app.handle(Method::GET, "/v1/test", test_handler, vec![]);
/// app.handle(
///     Method::GET,
///     "/v1/test/auth",
///     test_handler,
///     vec![
///         Arc::new(Authenticate::new(Arc::clone(&auth))),
///         Arc::new(Authorize::new(Arc::clone(&auth), RULE_ADMIN_ONLY)),
///     ],
/// );
/// ```
pub struct App {
    mux: Mux<Chain>,
    global: Vec<Arc<dyn Middleware>>,
    shutdown: ShutdownSignal,
    shutdown_predicate: ShutdownPredicate,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.mux.len())
            .field(
                "global",
                &self.global.iter().map(|mw| mw.name()).collect::<Vec<_>>(),
            )
            .field("shutdown", &self.shutdown.is_shutdown())
            .finish_non_exhaustive()
    }
}

impl App {
    /// Creates an application with the given global middleware, outermost
    /// first.
    pub fn new(shutdown: ShutdownSignal, global: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            mux: Mux::new(),
            global,
            shutdown,
            shutdown_predicate: is_integrity_failure,
        }
    }

    /// Replaces the predicate deciding which escaped errors stop the
    /// process. Defaults to [`is_integrity_failure`].
    #[must_use]
    pub fn with_shutdown_predicate(mut self, predicate: ShutdownPredicate) -> Self {
        self.shutdown_predicate = predicate;
        self
    }

    /// Registers `handler` for `method` and `path`.
    ///
    /// `route` middleware runs inside the global middleware, first entry
    /// outermost.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        route: Vec<Arc<dyn Middleware>>,
    ) {
        let chain = Chain::compose(&self.global, &route, Arc::new(handler));
        tracing::debug!(%method, path, middleware = ?chain.names(), "route registered");
        self.mux.insert(method, path, chain);
    }

    /// The shutdown signal shared with the server.
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Starts a graceful shutdown.
    pub fn signal_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// The underlying router.
    pub fn mux(&self) -> &Mux<Chain> {
        &self.mux
    }

    /// Handles one request end to end.
    pub async fn dispatch(&self, mut request: Request) -> Response {
        let (chain, params) = match self.mux.lookup(request.method(), request.uri().path()) {
            RouteLookup::Found { value, params } => (value, params),
            RouteLookup::MethodNotAllowed { allowed } => {
                let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                return response;
            }
            RouteLookup::NotFound => return error_response(StatusCode::NOT_FOUND, "Not Found"),
        };

        let mut ctx = RequestContext::new();
        request.extensions_mut().insert(ctx.trace_id());
        request.extensions_mut().insert(params);

        match chain.run(&mut ctx, request).await {
            Ok(response) => response,
            Err(err) => {
                if (self.shutdown_predicate)(&err) {
                    tracing::error!(
                        trace_id = %ctx.trace_id(),
                        error = ?err,
                        "integrity failure, starting graceful shutdown"
                    );
                    self.signal_shutdown();
                } else {
                    tracing::error!(
                        trace_id = %ctx.trace_id(),
                        error = ?err,
                        "error escaped the middleware chain"
                    );
                }
                error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::io;
    use warden_core::{PathParams, TraceId, WebError};
    use warden_middleware::stages::Errors;

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app() -> App {
        let mut app = App::new(ShutdownSignal::new(), vec![Arc::new(Errors::new())]);
        app.handle(
            Method::GET,
            "/v1/users/{id}",
            |req: Request| async move {
                let id = req
                    .extensions()
                    .get::<PathParams>()
                    .and_then(|p| p.get("id"))
                    .unwrap_or_default()
                    .to_string();
                let has_trace = req.extensions().get::<TraceId>().is_some();
                respond(&json!({"id": id, "traced": has_trace}), StatusCode::OK)
            },
            vec![],
        );
        app.handle(
            Method::GET,
            "/v1/fatal",
            |_req: Request| async {
                Err::<Response, _>(WebError::shutdown("integrity check failed"))
            },
            vec![],
        );
        app.handle(
            Method::GET,
            "/v1/gone",
            |_req: Request| async {
                Err::<Response, _>(WebError::shutdown_io(
                    "writing response",
                    io::Error::from(io::ErrorKind::BrokenPipe),
                ))
            },
            vec![],
        );
        app
    }

    #[tokio::test]
    async fn test_dispatch_passes_params_and_trace_id() {
        let response = app().dispatch(request(Method::GET, "/v1/users/7")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await, json!({"id": "7", "traced": true}));
    }

    #[tokio::test]
    async fn test_not_found_and_method_not_allowed() {
        let app = app();

        let response = app.dispatch(request(Method::GET, "/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await, json!({"error": "Not Found"}));

        let response = app.dispatch(request(Method::POST, "/v1/users/7")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET");
    }

    #[tokio::test]
    async fn test_integrity_failure_triggers_shutdown() {
        let app = app();
        let response = app.dispatch(request(Method::GET, "/v1/fatal")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await, json!({"error": "Internal Server Error"}));
        assert!(app.shutdown_signal().is_shutdown());
    }

    #[tokio::test]
    async fn test_peer_disconnect_does_not_trigger_shutdown() {
        let app = app();
        let response = app.dispatch(request(Method::GET, "/v1/gone")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!app.shutdown_signal().is_shutdown());
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let app = app().with_shutdown_predicate(|_| false);
        app.dispatch(request(Method::GET, "/v1/fatal")).await;
        assert!(!app.shutdown_signal().is_shutdown());
    }
}
