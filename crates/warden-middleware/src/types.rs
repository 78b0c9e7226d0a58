//! Common types used throughout the middleware chain.

use bytes::Bytes;
use http_body_util::Full;
use warden_core::WebResult;

/// The HTTP request type seen by middleware and handlers.
///
/// The server collects the body before the chain runs, so handlers can read
/// it as a byte slice.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced by the chain.
pub type Response = http::Response<Full<Bytes>>;

/// What a handler, a middleware or the whole chain returns.
pub type HandlerResult = WebResult<Response>;

/// Builds an empty-bodied response with the given status.
///
/// Used as the last resort when a JSON body cannot be produced.
#[must_use]
pub fn bare_response(status: http::StatusCode) -> Response {
    let mut response = http::Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
