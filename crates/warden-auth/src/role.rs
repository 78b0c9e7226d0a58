//! Roles carried in token claims.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A capability granted to a subject.
///
/// The set is closed; the textual form is the upper-case name.
///
/// ```
/// use warden_auth::Role;
///
/// let role: Role = "ADMIN".parse().unwrap();
/// assert_eq!(role, Role::Admin);
/// assert_eq!(role.to_string(), "ADMIN");
/// assert!("ROOT".parse::<Role>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full access.
    Admin,
    /// Regular user access.
    User,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    /// The textual name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A role name outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role {0:?}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}
