//! Liveness-style probes of the API listener itself.

use http::StatusCode;
use serde::Serialize;
use warden_middleware::{respond, HandlerResult, Request};

/// Body returned by the test routes.
#[derive(Debug, Serialize)]
pub struct Status {
    /// Always `OK`.
    pub status: &'static str,
}

/// `GET /v1/test` and `GET /v1/test/auth`.
pub async fn test(_req: Request) -> HandlerResult {
    respond(&Status { status: "OK" }, StatusCode::OK)
}
