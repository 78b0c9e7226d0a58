//! Route-level authentication and authorization middleware.
//!
//! [`Authenticate`] verifies the `Authorization: Bearer <token>` header and
//! stores the resulting [`Claims`] in the request extensions.
//! [`Authorize`] reads those claims and evaluates a policy rule against
//! them. Both short-circuit the chain on failure, so the handler never
//! runs for a rejected request.

use crate::{
    middleware::{BoxFuture, Middleware, Next},
    types::{HandlerResult, Request},
};
use http::header::AUTHORIZATION;
use std::sync::Arc;
use warden_auth::{Auth, AuthError, Claims};
use warden_core::{PathParams, RequestContext, WebError};

/// Verifies the bearer token.
#[derive(Debug, Clone)]
pub struct Authenticate {
    auth: Arc<Auth>,
}

impl Authenticate {
    /// Creates the middleware.
    #[must_use]
    pub fn new(auth: Arc<Auth>) -> Self {
        Self { auth }
    }
}

impl Middleware for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let header = request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| WebError::unauthorized("missing authorization header"))?;

            let claims = self.auth.authenticate(header).map_err(|err| {
                tracing::debug!(trace_id = %ctx.trace_id(), error = %err, "authentication failed");
                WebError::unauthorized(err.to_string())
            })?;

            request.extensions_mut().insert(claims);
            next.run(ctx, request).await
        })
    }
}

/// Evaluates an authorization rule against the authenticated claims.
#[derive(Debug, Clone)]
pub struct Authorize {
    auth: Arc<Auth>,
    rule: &'static str,
    user_param: Option<&'static str>,
}

impl Authorize {
    /// Authorizes by role alone.
    #[must_use]
    pub fn new(auth: Arc<Auth>, rule: &'static str) -> Self {
        Self {
            auth,
            rule,
            user_param: None,
        }
    }

    /// Also passes the path parameter `param` as the target user ID, for
    /// rules such as `rule_admin_or_subject`.
    #[must_use]
    pub fn with_user_param(mut self, param: &'static str) -> Self {
        self.user_param = Some(param);
        self
    }
}

impl Middleware for Authorize {
    fn name(&self) -> &'static str {
        "authorize"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let claims = request
                .extensions()
                .get::<Claims>()
                .ok_or_else(|| WebError::unauthorized("claims missing from request"))?;

            let verdict = match self.user_param {
                Some(param) => {
                    let user_id = request
                        .extensions()
                        .get::<PathParams>()
                        .and_then(|params| params.get(param))
                        .ok_or_else(|| {
                            WebError::internal(format!("route has no {param} parameter"))
                        })?;
                    self.auth.authorize_user(claims, self.rule, user_id)
                }
                None => self.auth.authorize(claims, self.rule),
            };

            match verdict {
                Ok(()) => next.run(ctx, request).await,
                Err(err @ AuthError::Forbidden { .. }) => Err(WebError::forbidden(err.to_string())),
                Err(err) => Err(WebError::internal_with_source(
                    format!("evaluating rule {}", self.rule),
                    err,
                )),
            }
        })
    }
}
