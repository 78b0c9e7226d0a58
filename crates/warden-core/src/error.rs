//! Error types for Warden.
//!
//! [`WebError`] is the closed set of failures a handler or middleware can
//! return. The errors middleware classifies it with an exhaustive match, so
//! every variant maps to exactly one response shape:
//!
//! | Variant | Status | Client body |
//! |---|---|---|
//! | `Validation` | 400 | `{"error": "data validation error", "fields": {..}}` |
//! | `Request` | handler-chosen | `{"error": message}` |
//! | `Unauthorized` | 401 | `{"error": "Unauthorized"}` |
//! | `Forbidden` | 403 | `{"error": "Forbidden"}` |
//! | `Shutdown`, `Panic`, `Internal` | 500 | `{"error": "Internal Server Error"}` |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using [`WebError`].
pub type WebResult<T> = Result<T, WebError>;

/// Client-facing message for every 5xx classification.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Client-facing message for field validation failures.
pub const VALIDATION_ERROR_MESSAGE: &str = "data validation error";

/// Standard error type flowing through the middleware chain.
///
/// # Example
///
/// ```
/// use warden_core::WebError;
/// use http::StatusCode;
///
/// let err = WebError::request(StatusCode::NOT_FOUND, "user not found");
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WebError {
    /// One or more payload fields failed validation.
    #[error("data validation error: {0}")]
    Validation(#[from] FieldErrors),

    /// An expected failure with a status code chosen by the handler.
    #[error("{message}")]
    Request {
        /// Status code to send.
        status: StatusCode,
        /// Message shown to the client.
        message: String,
    },

    /// Credentials are missing or invalid.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Server-side detail; never sent to the client.
        message: String,
    },

    /// Credentials are valid but the policy rejected the action.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Server-side detail; never sent to the client.
        message: String,
    },

    /// The service can no longer guarantee integrity and must stop.
    #[error("shutdown requested: {message}")]
    Shutdown {
        /// What went wrong.
        message: String,
        /// Underlying I/O failure, if any.
        #[source]
        source: Option<io::Error>,
    },

    /// A handler panicked and the panic was recovered.
    #[error("PANIC [{message}]")]
    Panic {
        /// Panic payload rendered as text.
        message: String,
        /// Backtrace captured at the panic site.
        backtrace: String,
    },

    /// Anything else.
    #[error("internal error: {message}")]
    Internal {
        /// Server-side detail; never sent to the client.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl WebError {
    /// Creates a request error with an explicit status.
    #[must_use]
    pub fn request(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Request {
            status,
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a shutdown error with no I/O cause.
    #[must_use]
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a shutdown error caused by an I/O failure.
    #[must_use]
    pub fn shutdown_io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Shutdown {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns `true` for the shutdown kind, whatever its cause.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown { .. })
    }

    /// Returns the HTTP status code this error is answered with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Request { status, .. } => *status,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Shutdown { .. } | Self::Panic { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Builds the body sent to the client. Internal detail never leaks.
    #[must_use]
    pub fn to_response_body(&self) -> ErrorResponse {
        match self {
            Self::Validation(fields) => ErrorResponse {
                error: VALIDATION_ERROR_MESSAGE.to_string(),
                fields: Some(fields.fields()),
            },
            Self::Request { message, .. } => ErrorResponse::new(message.clone()),
            Self::Unauthorized { .. } => ErrorResponse::new("Unauthorized"),
            Self::Forbidden { .. } => ErrorResponse::new("Forbidden"),
            Self::Shutdown { .. } | Self::Panic { .. } | Self::Internal { .. } => {
                ErrorResponse::new(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

/// Decides whether an error that escaped the chain must stop the process.
pub type ShutdownPredicate = fn(&WebError) -> bool;

/// Default [`ShutdownPredicate`].
///
/// Matches the shutdown kind, except when it was caused by the peer going
/// away (`BrokenPipe`, `ConnectionReset`), which only affects that client.
pub fn is_integrity_failure(err: &WebError) -> bool {
    match err {
        WebError::Shutdown {
            source: Some(io), ..
        } => !matches!(
            io.kind(),
            io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
        ),
        WebError::Shutdown { source: None, .. } => true,
        _ => false,
    }
}

/// The JSON shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Client-facing message.
    pub error: String,
    /// Field name to message, present only for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl ErrorResponse {
    /// Creates a body without field detail.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: None,
        }
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in the JSON payload.
    pub field: String,
    /// What is wrong with it.
    pub error: String,
}

/// A collection of field failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for `field`.
    pub fn add(&mut self, field: impl Into<String>, error: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            error: error.into(),
        });
    }

    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the recorded failures in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Field name to message. A later failure on the same field wins.
    #[must_use]
    pub fn fields(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|fe| (fe.field.clone(), fe.error.clone()))
            .collect()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fe) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", fe.field, fe.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_body_has_fields() {
        let mut fields = FieldErrors::new();
        fields.add("email", "must be a valid email address");
        fields.add("name", "is required");

        let err = WebError::from(fields);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = err.to_response_body();
        assert_eq!(body.error, "data validation error");
        let fields = body.fields.unwrap();
        assert_eq!(fields["email"], "must be a valid email address");
        assert_eq!(fields["name"], "is required");
    }

    #[test]
    fn test_request_error_keeps_status_and_message() {
        let err = WebError::request(StatusCode::CONFLICT, "email already in use");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_response_body(), ErrorResponse::new("email already in use"));
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let err = WebError::internal("db password rejected for user sales");
        let body = serde_json::to_string(&err.to_response_body()).unwrap();
        assert_eq!(body, r#"{"error":"Internal Server Error"}"#);
    }

    #[test]
    fn test_auth_errors_map_to_401_and_403() {
        assert_eq!(
            WebError::unauthorized("no token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WebError::forbidden("rule rejected").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WebError::unauthorized("expired").to_response_body().error,
            "Unauthorized"
        );
    }

    #[test]
    fn test_integrity_failure_predicate() {
        assert!(is_integrity_failure(&WebError::shutdown("integrity check failed")));
        assert!(is_integrity_failure(&WebError::shutdown_io(
            "write failed",
            io::Error::from(io::ErrorKind::Other),
        )));
        assert!(!is_integrity_failure(&WebError::shutdown_io(
            "client went away",
            io::Error::from(io::ErrorKind::BrokenPipe),
        )));
        assert!(!is_integrity_failure(&WebError::shutdown_io(
            "client went away",
            io::Error::from(io::ErrorKind::ConnectionReset),
        )));
        assert!(!is_integrity_failure(&WebError::internal("boom")));
    }

    #[test]
    fn test_field_errors_display_and_last_wins() {
        let mut fields = FieldErrors::new();
        fields.add("password", "is required");
        fields.add("password", "too short");
        assert_eq!(fields.to_string(), "password: is required; password: too short");
        assert_eq!(fields.fields()["password"], "too short");
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
