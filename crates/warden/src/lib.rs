//! # Warden
//!
//! The sales API service: handlers, route wiring and the `warden-api`
//! binary that runs them.
//!
//! Every route is served through the global middleware stack
//! (Logger, Errors, Metrics, Deadline, Panics). Protected routes add
//! [`Authenticate`] and [`Authorize`] nearest the handler.
//!
//! | Method | Path                  | Route middleware                              |
//! |--------|-----------------------|-----------------------------------------------|
//! | GET    | `/v1/test`            | none                                          |
//! | GET    | `/v1/test/auth`       | Authenticate, Authorize(`rule_admin_only`)    |
//! | POST   | `/v1/test/users`      | none                                          |
//! | GET    | `/v1/test/users/{id}` | Authenticate, Authorize(`rule_admin_or_subject`) |

pub mod handlers;

use http::Method;
use std::sync::Arc;
use std::time::Duration;
use warden_auth::{Auth, RULE_ADMIN_ONLY, RULE_ADMIN_OR_SUBJECT};
use warden_middleware::stages::{Authenticate, Authorize};
use warden_middleware::{global_middleware, Middleware};
use warden_server::{App, ShutdownSignal};
use warden_telemetry::Metrics;

/// Builds the API application with the global middleware stack and every
/// route registered. Requests running longer than `write_timeout` are
/// cancelled with a 503.
pub fn api_app(
    shutdown: ShutdownSignal,
    metrics: Arc<Metrics>,
    auth: Arc<Auth>,
    write_timeout: Duration,
) -> App {
    let mut app = App::new(shutdown, global_middleware(metrics, write_timeout));
    routes(&mut app, &auth);
    app
}

/// Registers the service routes on `app`.
pub fn routes(app: &mut App, auth: &Arc<Auth>) {
    app.handle(Method::GET, "/v1/test", handlers::testgrp::test, vec![]);

    app.handle(
        Method::GET,
        "/v1/test/auth",
        handlers::testgrp::test,
        protected(Authorize::new(Arc::clone(auth), RULE_ADMIN_ONLY), auth),
    );

    app.handle(
        Method::POST,
        "/v1/test/users",
        handlers::usergrp::create,
        vec![],
    );

    app.handle(
        Method::GET,
        "/v1/test/users/{id}",
        handlers::usergrp::query_by_id,
        protected(
            Authorize::new(Arc::clone(auth), RULE_ADMIN_OR_SUBJECT).with_user_param("id"),
            auth,
        ),
    );
}

/// Authenticate, then `authorize`.
fn protected(authorize: Authorize, auth: &Arc<Auth>) -> Vec<Arc<dyn Middleware>> {
    vec![
        Arc::new(Authenticate::new(Arc::clone(auth))),
        Arc::new(authorize),
    ]
}
