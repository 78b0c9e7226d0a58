//! Composition of middleware around a handler.
//!
//! A [`Chain`] holds its middleware outermost first. Composing global and
//! route middleware puts every global layer outside every route layer, so
//! route middleware always runs nearer the handler:
//!
//! ```text
//! Logger → Errors → Metrics → Panics → Authenticate → Authorize → handler
//! └──────────── global ────────────┘   └─────── route ───────┘
//! ```

use crate::middleware::{Handler, Middleware, Next};
use crate::types::{HandlerResult, Request};
use std::fmt;
use std::sync::Arc;
use warden_core::RequestContext;

/// A handler wrapped in an ordered list of middleware.
#[derive(Clone)]
pub struct Chain {
    /// Outermost first.
    middleware: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn Handler>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("middleware", &self.names())
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// A chain with no middleware.
    pub fn new(handler: impl Handler) -> Self {
        Self {
            middleware: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Wraps `handler` in `route` middleware, then in `global` middleware.
    ///
    /// Within each list the first entry runs outermost.
    pub fn compose(
        global: &[Arc<dyn Middleware>],
        route: &[Arc<dyn Middleware>],
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            middleware: global.iter().chain(route).cloned().collect(),
            handler,
        }
    }

    /// Adds a layer inside every existing one.
    #[must_use]
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Middleware names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|mw| mw.name()).collect()
    }

    /// Runs the request through every layer and the handler.
    pub async fn run(&self, ctx: &mut RequestContext, request: Request) -> HandlerResult {
        let mut next = Next::handler(self.handler.as_ref());
        for middleware in self.middleware.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next.run(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::BoxFuture;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::Mutex;
    use warden_core::WebError;

    /// Records entry and exit into a shared log.
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Trace {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("enter {}", self.name));
                let result = next.run(ctx, request).await;
                self.log.lock().unwrap().push(format!("exit {}", self.name));
                result
            })
        }
    }

    fn trace(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Middleware> {
        Arc::new(Trace {
            name,
            log: Arc::clone(log),
        })
    }

    fn request() -> Request {
        http::Request::builder().uri("/").body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_global_wraps_route_and_first_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&log);
        let handler = move |_req: Request| {
            handler_log.lock().unwrap().push("handler".to_string());
            async { Ok::<_, WebError>(http::Response::new(Full::new(Bytes::new()))) }
        };

        let chain = Chain::compose(
            &[trace("g1", &log), trace("g2", &log)],
            &[trace("r1", &log), trace("r2", &log)],
            Arc::new(handler),
        );
        assert_eq!(chain.names(), ["g1", "g2", "r1", "r2"]);

        let mut ctx = RequestContext::new();
        chain.run(&mut ctx, request()).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            [
                "enter g1", "enter g2", "enter r1", "enter r2", "handler", "exit r2", "exit r1",
                "exit g2", "exit g1",
            ]
        );
        assert_eq!(ctx.status_code(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_empty_chain_runs_handler() {
        let chain = Chain::new(|_req: Request| async {
            let mut response = http::Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::NO_CONTENT;
            Ok::<_, WebError>(response)
        });

        let mut ctx = RequestContext::new();
        let response = chain.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(chain.names().is_empty());
    }
}
