//! User payload handling.
//!
//! There is no store behind these routes; `create` validates and echoes
//! the new user with a fresh id, and `query_by_id` reports who asked.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_auth::{Claims, Role};
use warden_core::{Check, FieldErrors, Validate, WebError};
use warden_middleware::{decode, param, respond, HandlerResult, Request};

/// Payload for creating a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact address.
    #[serde(default)]
    pub email: String,
    /// Role names, `ADMIN` or `USER`.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Optional department.
    #[serde(default)]
    pub department: String,
    /// Plain-text password.
    #[serde(default)]
    pub password: String,
    /// Must match `password`.
    #[serde(default)]
    pub password_confirm: String,
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), FieldErrors> {
        let role_names: Vec<&str> = Role::ALL.iter().map(|r| r.name()).collect();

        Check::new()
            .required("name", &self.name)
            .required("email", &self.email)
            .email("email", &self.email)
            .required_list("roles", &self.roles)
            .one_of("roles", &self.roles, &role_names)
            .required("password", &self.password)
            .equal_field(
                "passwordConfirm",
                &self.password_confirm,
                "password",
                &self.password,
            )
            .finish()
    }
}

/// A user as returned to clients. The password never leaves the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Generated identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Granted roles.
    pub roles: Vec<Role>,
    /// Department, possibly empty.
    pub department: String,
}

/// `POST /v1/test/users`
pub async fn create(req: Request) -> HandlerResult {
    let new_user: NewUser = decode(&req)?;

    let roles = new_user
        .roles
        .iter()
        .map(|name| name.parse::<Role>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| WebError::request(StatusCode::BAD_REQUEST, e.to_string()))?;

    let user = User {
        id: Uuid::now_v7().to_string(),
        name: new_user.name,
        email: new_user.email,
        roles,
        department: new_user.department,
    };

    tracing::info!(user_id = %user.id, "user created");
    respond(&user, StatusCode::CREATED)
}

/// Body of `GET /v1/test/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The requested id.
    pub id: String,
    /// Subject of the caller's token.
    pub subject: String,
    /// Roles of the caller's token.
    pub roles: Vec<Role>,
}

/// `GET /v1/test/users/{id}`, behind `Authenticate` and `Authorize`.
pub async fn query_by_id(req: Request) -> HandlerResult {
    let id = param(&req, "id")
        .ok_or_else(|| WebError::request(StatusCode::BAD_REQUEST, "missing user id"))?
        .to_string();

    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| WebError::unauthorized("claims missing from request"))?;

    respond(
        &Subject {
            id,
            subject: claims.subject.clone(),
            roles: claims.roles.iter().copied().collect(),
        },
        StatusCode::OK,
    )
}
