//! Error types for the auth crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors returned by [`Auth`](crate::Auth).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No key is registered under the kid.
    #[error("key not found: {kid}")]
    KeyNotFound {
        /// The missing key identifier.
        kid: String,
    },

    /// The private key PEM could not be parsed.
    #[error("parsing private key {kid}: {message}")]
    KeyParse {
        /// The key identifier.
        kid: String,
        /// Parser detail.
        message: String,
    },

    /// Signing the claims failed.
    #[error("signing token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// The header is not `Bearer <token>`.
    #[error("expected authorization header format: Bearer <token>")]
    MalformedHeader,

    /// The token is not a well-formed JWT.
    #[error("parsing token: {0}")]
    TokenParse(#[source] jsonwebtoken::errors::Error),

    /// The token header has no `kid`.
    #[error("kid missing from token header")]
    MissingKeyId,

    /// The token was rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The authorization rule rejected the claims.
    #[error("you are not authorized for that action, claims[{roles}] rule[{rule}]")]
    Forbidden {
        /// Roles carried by the claims.
        roles: String,
        /// The rule that rejected them.
        rule: String,
    },

    /// The policy engine itself failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl AuthError {
    /// Returns `true` for failures a client can cause with bad credentials.
    pub const fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::MalformedHeader
                | Self::TokenParse(_)
                | Self::MissingKeyId
                | Self::AuthenticationFailed(_)
        )
    }
}

/// Errors from the policy evaluator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// The rule module did not compile.
    #[error("compiling policy module {module}: {message}")]
    Compile {
        /// Module file name.
        module: String,
        /// Engine detail.
        message: String,
    },

    /// The query could not be evaluated.
    #[error("evaluating {query}: {message}")]
    Evaluation {
        /// The query.
        query: String,
        /// Engine detail.
        message: String,
    },

    /// The query produced no value.
    #[error("no results for {query}")]
    NoResult {
        /// The query.
        query: String,
    },

    /// The query produced something other than a boolean.
    #[error("{query} produced {found}, expected a boolean")]
    Type {
        /// The query.
        query: String,
        /// The value found.
        found: String,
    },

    /// The input could not be serialized.
    #[error("invalid policy input: {0}")]
    InvalidInput(#[from] serde_json::Error),
}

/// Errors from a [`KeyLookup`](crate::KeyLookup).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyLookupError {
    /// No key is registered under the kid.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A key file could not be read.
    #[error("reading key file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A key file is larger than the accepted maximum.
    #[error("key file {path} exceeds {max} bytes")]
    TooLarge {
        /// File path.
        path: PathBuf,
        /// Maximum accepted size.
        max: u64,
    },

    /// A PEM did not parse as an RSA key.
    #[error("invalid key {kid}: {message}")]
    InvalidKey {
        /// The key identifier.
        kid: String,
        /// Parser detail.
        message: String,
    },
}
