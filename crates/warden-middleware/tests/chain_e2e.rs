//! End-to-end tests of the full global stack.

use bytes::Bytes;
use chrono::Duration;
use http::StatusCode;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_auth::{Auth, Claims, KeyPair, KeyStore, Role, RULE_ADMIN_ONLY};
use warden_core::{RequestContext, WebError};
use warden_middleware::stages::{Authenticate, Authorize};
use warden_middleware::{global_middleware, respond, Chain, Handler, Middleware, Request, Response};
use warden_telemetry::Metrics;

const KID: &str = "e2e-kid";
const ISSUER: &str = "service project";
const WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

fn global(metrics: Arc<Metrics>) -> Vec<Arc<dyn Middleware>> {
    global_middleware(metrics, WRITE_TIMEOUT)
}

fn auth() -> Arc<Auth> {
    let mut store = KeyStore::new();
    store.insert(
        KID,
        KeyPair::new(
            KID,
            include_str!("../../warden-auth/tests/fixtures/signing.pem"),
            include_str!("../../warden-auth/tests/fixtures/signing.pub.pem"),
        )
        .unwrap(),
    );
    Arc::new(Auth::new(Arc::new(store), ISSUER).unwrap())
}

fn get(path: &str) -> Request {
    http::Request::builder().uri(path).body(Bytes::new()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn status_ok(_req: Request) -> Result<Response, WebError> {
    respond(&json!({"status": "OK"}), StatusCode::OK)
}

#[tokio::test]
async fn test_panic_is_answered_and_counted_without_affecting_others() {
    let metrics = Arc::new(Metrics::new());
    let global = global(Arc::clone(&metrics));

    let panicking = Chain::compose(
        &global,
        &[],
        Arc::new(|req: Request| async move {
            if true {
                panic!("index out of range");
            }
            status_ok(req).await
        }),
    );
    let healthy = Chain::compose(&global, &[], Arc::new(status_ok));

    let mut ctx = RequestContext::new();
    let response = panicking.run(&mut ctx, get("/boom")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ctx.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(json_body(response).await, json!({"error": "Internal Server Error"}));

    let mut ctx = RequestContext::new();
    let response = healthy.run(&mut ctx, get("/ok")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.panics, 1);
    assert_eq!(snapshot.errors, 1);
    assert_eq!(snapshot.requests, 2);
}

#[tokio::test]
async fn test_authentication_runs_before_the_handler() {
    let auth = auth();
    let metrics = Arc::new(Metrics::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let counted = Arc::clone(&calls);
    let handler: Arc<dyn Handler> = Arc::new(move |req: Request| {
        counted.fetch_add(1, Ordering::SeqCst);
        status_ok(req)
    });
    let route: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(Authenticate::new(Arc::clone(&auth))),
        Arc::new(Authorize::new(Arc::clone(&auth), RULE_ADMIN_ONLY)),
    ];
    let chain = Chain::compose(&global(Arc::clone(&metrics)), &route, handler);

    let mut ctx = RequestContext::new();
    let response = chain.run(&mut ctx, get("/v1/test/auth")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Unauthorized"}));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let claims = Claims::new("user-1", ISSUER, [Role::User], Duration::hours(1));
    let token = auth.generate_token(KID, &claims).unwrap();
    let request = http::Request::builder()
        .uri("/v1/test/auth")
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Bytes::new())
        .unwrap();
    let mut ctx = RequestContext::new();
    let response = chain.run(&mut ctx, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let claims = Claims::new("admin-1", ISSUER, [Role::Admin], Duration::hours(1));
    let token = auth.generate_token(KID, &claims).unwrap();
    let request = http::Request::builder()
        .uri("/v1/test/auth")
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Bytes::new())
        .unwrap();
    let mut ctx = RequestContext::new();
    let response = chain.run(&mut ctx, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(metrics.snapshot().errors, 2);
}

#[tokio::test]
async fn test_shutdown_error_escapes_the_stack() {
    let metrics = Arc::new(Metrics::new());
    let chain = Chain::compose(
        &global(metrics),
        &[],
        Arc::new(|_req: Request| async {
            Err::<Response, _>(WebError::shutdown("database integrity lost"))
        }),
    );

    let mut ctx = RequestContext::new();
    let result = chain.run(&mut ctx, get("/")).await;
    assert!(matches!(result, Err(ref err) if err.is_shutdown()));
    assert_eq!(ctx.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_request_is_counted_and_answered() {
    let metrics = Arc::new(Metrics::new());
    let chain = Chain::compose(
        &global(Arc::clone(&metrics)),
        &[],
        Arc::new(|req: Request| async move {
            tokio::time::sleep(WRITE_TIMEOUT * 2).await;
            status_ok(req).await
        }),
    );

    let mut ctx = RequestContext::new();
    let response = chain.run(&mut ctx, get("/slow")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ctx.status_code(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(json_body(response).await, json!({"error": "request timed out"}));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.requests, 1);
    assert_eq!(snapshot.errors, 1);
}
