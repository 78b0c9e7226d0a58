//! Debug endpoints, served on their own listener.
//!
//! - `GET /debug/vars` - JSON snapshot of the request metrics
//! - `GET /debug/readiness` - 200 while serving, 503 once shutdown starts
//! - `GET /debug/liveness` - 200 with host, build and uptime
//! - `GET /metrics` - Prometheus text, when the exporter is installed

use crate::app::App;
use crate::shutdown::ShutdownSignal;
use bytes::Bytes;
use http::{header, Method, StatusCode};
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use warden_core::WebError;
use warden_middleware::stages::Errors;
use warden_middleware::{respond, HandlerResult, Request};
use warden_telemetry::{render_metrics, Metrics};

/// Body of `/debug/readiness`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    /// `ok` or `shutting down`.
    pub status: String,
}

/// Body of `/debug/liveness`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liveness {
    /// Always `up`.
    pub status: String,
    /// Host name, from `HOSTNAME`.
    pub host: String,
    /// Build identifier.
    pub build: String,
    /// Seconds since the debug app was created.
    pub uptime_seconds: u64,
}

/// Builds the debug application.
///
/// It shares `shutdown` with the API server, so readiness flips as soon as
/// shutdown starts and the debug listener drains with everything else.
pub fn debug_app(metrics: Arc<Metrics>, shutdown: ShutdownSignal, build: impl Into<String>) -> App {
    let started = Instant::now();
    let build = build.into();
    let mut app = App::new(shutdown.clone(), vec![Arc::new(Errors::new())]);

    app.handle(
        Method::GET,
        "/debug/vars",
        move |_req: Request| {
            let snapshot = metrics.snapshot();
            async move { respond(&snapshot, StatusCode::OK) }
        },
        vec![],
    );

    app.handle(
        Method::GET,
        "/debug/readiness",
        move |_req: Request| {
            let shutting_down = shutdown.is_shutdown();
            async move {
                if shutting_down {
                    respond(
                        &Readiness {
                            status: "shutting down".to_string(),
                        },
                        StatusCode::SERVICE_UNAVAILABLE,
                    )
                } else {
                    respond(
                        &Readiness {
                            status: "ok".to_string(),
                        },
                        StatusCode::OK,
                    )
                }
            }
        },
        vec![],
    );

    app.handle(
        Method::GET,
        "/debug/liveness",
        move |_req: Request| {
            let body = Liveness {
                status: "up".to_string(),
                host: std::env::var("HOSTNAME").unwrap_or_else(|_| "unavailable".to_string()),
                build: build.clone(),
                uptime_seconds: started.elapsed().as_secs(),
            };
            async move { respond(&body, StatusCode::OK) }
        },
        vec![],
    );

    app.handle(Method::GET, "/metrics", prometheus, vec![]);

    app
}

async fn prometheus(_req: Request) -> HandlerResult {
    let text = render_metrics().ok_or_else(|| {
        WebError::request(StatusCode::NOT_FOUND, "metrics exporter not installed")
    })?;

    http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(text)))
        .map_err(|e| WebError::internal_with_source("building metrics response", e))
}
