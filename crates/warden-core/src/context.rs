//! Request context types.
//!
//! The [`RequestContext`] is created once per inbound request by the
//! application adapter and threaded by `&mut` through every middleware. It
//! is owned by the request's task for its whole lifetime, so it needs no
//! synchronization.

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for a burst of requests
/// sortable by id.
///
/// # Example
///
/// ```
/// use warden_core::TraceId;
///
/// let a = TraceId::new();
/// let b = TraceId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Creates a new unique trace ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Peer address of the connection a request arrived on.
///
/// Inserted into the request extensions by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

impl std::fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path parameters captured by the router, e.g. `id` for `/users/{id}`.
///
/// Inserted into the request extensions before the chain runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a captured parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-request record shared by every layer of the chain.
///
/// # Example
///
/// ```
/// use warden_core::RequestContext;
/// use http::StatusCode;
///
/// let mut ctx = RequestContext::new();
/// assert_eq!(ctx.status_code(), None);
///
/// ctx.set_status_code(StatusCode::CREATED);
/// assert_eq!(ctx.status_code(), Some(StatusCode::CREATED));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: TraceId,
    started_at: Instant,
    now: DateTime<Utc>,
    status_code: Option<StatusCode>,
}

impl RequestContext {
    /// Creates a context with a fresh trace ID, starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_id: TraceId::new(),
            started_at: Instant::now(),
            now: Utc::now(),
            status_code: None,
        }
    }

    /// Returns the trace ID.
    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Monotonic start instant.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Wall-clock time the request was received.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Time since the request was received.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Status of the response written for this request, if any yet.
    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        self.status_code
    }

    /// Records the status of the response being written.
    pub fn set_status_code(&mut self, status: StatusCode) {
        self.status_code = Some(status);
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
