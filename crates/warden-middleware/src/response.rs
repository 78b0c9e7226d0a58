//! Helpers handlers use to read requests and write responses.

use crate::types::{Request, Response};
use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::Serialize;
use warden_core::{PathParams, Validate, WebError, WebResult};

/// Serializes `data` as JSON with the given status.
///
/// A `204 No Content` response carries no body and no content type.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use warden_middleware::respond;
///
/// let response = respond(&serde_json::json!({"status": "ok"}), StatusCode::OK).unwrap();
/// assert_eq!(response.headers()["content-type"], "application/json");
/// ```
pub fn respond<T: Serialize + ?Sized>(data: &T, status: StatusCode) -> WebResult<Response> {
    if status == StatusCode::NO_CONTENT {
        return http::Response::builder()
            .status(status)
            .body(Full::new(Bytes::new()))
            .map_err(|e| WebError::internal_with_source("building response", e));
    }

    let body = serde_json::to_vec(data)
        .map_err(|e| WebError::internal_with_source("encoding response", e))?;

    http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .map_err(|e| WebError::internal_with_source("building response", e))
}

/// Decodes the JSON body into `T` and validates it.
///
/// Bodies that are not valid JSON for `T` (including unknown fields, when
/// `T` denies them) become a 400 request error. Field rule failures become
/// [`WebError::Validation`].
pub fn decode<T>(request: &Request) -> WebResult<T>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_slice(request.body()).map_err(|e| {
        WebError::request(StatusCode::BAD_REQUEST, format!("unable to decode payload: {e}"))
    })?;
    value.validate()?;
    Ok(value)
}

/// Returns the named path parameter captured by the router.
pub fn param<'r>(request: &'r Request, name: &str) -> Option<&'r str> {
    request
        .extensions()
        .get::<PathParams>()
        .and_then(|params| params.get(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use warden_core::{Check, FieldErrors};

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Payload {
        name: String,
        email: String,
    }

    impl Validate for Payload {
        fn validate(&self) -> Result<(), FieldErrors> {
            Check::new()
                .required("name", &self.name)
                .email("email", &self.email)
                .finish()
        }
    }

    fn json_request(body: &str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/")
            .body(Bytes::from(body.to_string()))
            .unwrap()
    }

    async fn body(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_respond_json() {
        let response = respond(&serde_json::json!({"id": 7}), StatusCode::CREATED).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body(response).await, Bytes::from_static(br#"{"id":7}"#));
    }

    #[tokio::test]
    async fn test_respond_no_content_has_empty_body() {
        let response = respond(&serde_json::json!({"ignored": true}), StatusCode::NO_CONTENT).unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert!(body(response).await.is_empty());
    }

    #[test]
    fn test_decode_valid_payload() {
        let request = json_request(r#"{"name": "Ada", "email": "ada@example.com"}"#);
        let payload: Payload = decode(&request).unwrap();
        assert_eq!(payload.name, "Ada");
    }

    #[test]
    fn test_decode_rejects_unknown_fields() {
        let request = json_request(r#"{"name": "Ada", "email": "ada@example.com", "admin": true}"#);
        let err = decode::<Payload>(&request).unwrap_err();
        assert!(matches!(err, WebError::Request { status, .. } if status == StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_decode_reports_field_errors() {
        let request = json_request(r#"{"name": "", "email": "nope"}"#);
        let err = decode::<Payload>(&request).unwrap_err();
        let WebError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields = fields.fields();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_param_lookup() {
        let mut request = json_request("");
        assert_eq!(param(&request, "id"), None);

        let mut params = PathParams::new();
        params.insert("id", "42");
        request.extensions_mut().insert(params);
        assert_eq!(param(&request, "id"), Some("42"));
    }
}
