//! Warden Auth - signed identity tokens and OPA/Rego access policy
//!
//! This crate issues RS256 tokens, verifies bearer tokens and evaluates
//! authorization rules.
//!
//! # Overview
//!
//! ```text
//!   Authorization: Bearer <jwt>
//!              │
//!   ┌──────────▼─────────────┐   kid    ┌─────────────────────┐
//!   │ Auth::authenticate     │─────────▶│ public key cache     │──▶ KeyLookup
//!   │ (unverified parse)     │◀─────────│ (RwLock, no evict)   │
//!   └──────────┬─────────────┘   PEM    └─────────────────────┘
//!              │ {Key, Token, ISS}
//!   ┌──────────▼─────────────┐
//!   │ PolicyEvaluator        │  data.warden.policy.auth
//!   │ (regorus engine)       │
//!   └──────────┬─────────────┘
//!              │ Claims
//!   ┌──────────▼─────────────┐
//!   │ Auth::authorize        │  data.warden.policy.<rule>
//!   └────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chrono::Duration;
//! use warden_auth::{Auth, Claims, KeyStore, Role, RULE_ADMIN_ONLY};
//!
//! let keys = Arc::new(KeyStore::from_dir("zarf/keys")?);
//! let auth = Auth::new(keys, "service project")?;
//!
//! let claims = Claims::new("user-1", "service project", [Role::Admin], Duration::hours(1));
//! let token = auth.generate_token("54bb2165-71e1-41a6-af3e-7da4a0e1e2c1", &claims)?;
//!
//! let verified = auth.authenticate(&format!("Bearer {token}"))?;
//! auth.authorize(&verified, RULE_ADMIN_ONLY)?;
//! ```

#![doc(html_root_url = "https://docs.rs/warden-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
mod claims;
mod error;
mod keystore;
mod policy;
mod role;

pub use auth::{Auth, SIGNING_ALGORITHM};
pub use claims::Claims;
pub use error::{AuthError, AuthResult, KeyLookupError, PolicyError};
pub use keystore::{KeyLookup, KeyPair, KeyStore, MAX_KEY_FILE_SIZE};
pub use policy::{
    PolicyEvaluator, PolicyModule, POLICY_PACKAGE, RULE_ADMIN_ONLY, RULE_ADMIN_OR_SUBJECT,
    RULE_ANY, RULE_AUTHENTICATE, RULE_USER_ONLY,
};
pub use role::{ParseRoleError, Role};
