//! Token claims.

use crate::role::Role;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The identity asserted by a signed token.
///
/// Timestamps are whole seconds, matching the JWT `NumericDate` encoding, so
/// a token round trip yields an equal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The subject, usually a user ID.
    #[serde(rename = "sub")]
    pub subject: String,
    /// Who issued the token.
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Expiry.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    /// Issue time.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    /// Granted roles.
    pub roles: BTreeSet<Role>,
}

impl Claims {
    /// Claims issued now and valid for `ttl`.
    pub fn new(
        subject: impl Into<String>,
        issuer: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now().trunc_subsecs(0);
        Self {
            subject: subject.into(),
            issuer: issuer.into(),
            expires_at: now + ttl,
            issued_at: now,
            roles: roles.into_iter().collect(),
        }
    }

    /// Role names, as handed to the authorization policy.
    pub fn role_names(&self) -> Vec<&'static str> {
        self.roles.iter().map(|r| r.name()).collect()
    }
}
