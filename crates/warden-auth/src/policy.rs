//! Policy evaluation using OPA/Rego.
//!
//! Two static rule modules are compiled into the binary, one for
//! authentication and one for authorization. Both live in the
//! [`POLICY_PACKAGE`] namespace and expose boolean rules that are queried
//! as `data.<package>.<rule>`.
//!
//! The authentication module cannot check a JWT signature in pure Rego, so
//! every engine gets the host builtin `verify_rs256(token, key_pem, issuer)`.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use regorus::{Engine, Value};
use std::time::Instant;
use tracing::{debug, instrument};

use crate::error::PolicyError;

/// Package every rule module declares.
pub const POLICY_PACKAGE: &str = "warden.policy";

/// Rule in the authentication module that accepts a token.
pub const RULE_AUTHENTICATE: &str = "auth";
/// Any known role.
pub const RULE_ANY: &str = "rule_any";
/// Admins only.
pub const RULE_ADMIN_ONLY: &str = "rule_admin_only";
/// Users only.
pub const RULE_USER_ONLY: &str = "rule_user_only";
/// Admins, or a user acting on their own subject.
pub const RULE_ADMIN_OR_SUBJECT: &str = "rule_admin_or_subject";

const AUTHENTICATION_REGO: &str = include_str!("../rego/authentication.rego");
const AUTHORIZATION_REGO: &str = include_str!("../rego/authorization.rego");

const VERIFY_BUILTIN: &str = "verify_rs256";

/// Which rule module a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyModule {
    /// Token verification rules.
    Authentication,
    /// Role-based access rules.
    Authorization,
}

impl PolicyModule {
    /// File name the module is registered under.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Authentication => "authentication.rego",
            Self::Authorization => "authorization.rego",
        }
    }
}

/// OPA/Rego policy evaluator.
///
/// Each module is compiled once into a prepared [`Engine`]. Evaluations run
/// on a clone of it, so concurrent requests never share input.
#[derive(Clone)]
pub struct PolicyEvaluator {
    authentication: Engine,
    authorization: Engine,
}

impl std::fmt::Debug for PolicyEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEvaluator")
            .field("package", &POLICY_PACKAGE)
            .finish_non_exhaustive()
    }
}

impl PolicyEvaluator {
    /// Evaluator over the built-in rule modules.
    pub fn new() -> Result<Self, PolicyError> {
        Self::with_modules(AUTHENTICATION_REGO, AUTHORIZATION_REGO)
    }

    /// Evaluator over caller-supplied module source.
    ///
    /// Invalid text fails here rather than on the first request.
    pub fn with_modules(
        authentication: impl Into<String>,
        authorization: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            authentication: compile(PolicyModule::Authentication, authentication.into())?,
            authorization: compile(PolicyModule::Authorization, authorization.into())?,
        })
    }

    /// Evaluates `data.<package>.<rule>` in `module` against `input`.
    #[instrument(skip(self, input))]
    pub fn evaluate(
        &self,
        module: PolicyModule,
        rule: &str,
        input: &serde_json::Value,
    ) -> Result<bool, PolicyError> {
        let start = Instant::now();

        let mut engine = match module {
            PolicyModule::Authentication => self.authentication.clone(),
            PolicyModule::Authorization => self.authorization.clone(),
        };
        engine.set_input(input.clone().into());

        let query = format!("data.{POLICY_PACKAGE}.{rule}");
        let results = engine
            .eval_query(query.clone(), false)
            .map_err(|e| PolicyError::Evaluation {
                query: query.clone(),
                message: e.to_string(),
            })?;

        let value = results
            .result
            .first()
            .and_then(|r| r.expressions.first())
            .map(|expr| &expr.value);

        let verdict = match value {
            None | Some(Value::Undefined) => return Err(PolicyError::NoResult { query }),
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(PolicyError::Type {
                    query,
                    found: format!("{other:?}"),
                })
            }
        };

        debug!(
            rule,
            verdict,
            elapsed_us = start.elapsed().as_micros(),
            "policy evaluation complete"
        );
        Ok(verdict)
    }
}

/// Builds the prepared engine for `module`, with the verification builtin.
fn compile(module: PolicyModule, source: String) -> Result<Engine, PolicyError> {
    let compile_error = |e: anyhow::Error| PolicyError::Compile {
        module: module.file_name().to_string(),
        message: e.to_string(),
    };

    let mut engine = Engine::new();
    engine
        .add_extension(
            VERIFY_BUILTIN.to_string(),
            3,
            Box::new(|params: Vec<Value>| -> anyhow::Result<Value> {
                let verified = match (&params[0], &params[1], &params[2]) {
                    (Value::String(token), Value::String(key), Value::String(issuer)) => {
                        verify_rs256(token, key, issuer)
                    }
                    _ => false,
                };
                Ok(Value::Bool(verified))
            }),
        )
        .map_err(compile_error)?;
    engine
        .add_policy(module.file_name().to_string(), source)
        .map_err(compile_error)?;
    Ok(engine)
}

/// Checks the RS256 signature, the `iss` claim and expiry.
///
/// Any other algorithm in the token header is rejected.
fn verify_rs256(token: &str, key_pem: &str, issuer: &str) -> bool {
    let Ok(key) = DecodingKey::from_rsa_pem(key_pem.as_bytes()) else {
        return false;
    };

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);
    validation.validate_aud = false;

    match jsonwebtoken::decode::<serde_json::Value>(token, &key, &validation) {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "token verification rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluator() -> PolicyEvaluator {
        PolicyEvaluator::new().unwrap()
    }

    fn authz_input(roles: &[&str], subject: &str, user_id: &str) -> serde_json::Value {
        json!({ "Roles": roles, "Subject": subject, "UserID": user_id })
    }

    #[test]
    fn test_builtin_modules_compile() {
        assert!(PolicyEvaluator::new().is_ok());
    }

    #[test]
    fn test_admin_only() {
        let ev = evaluator();
        let admin = authz_input(&["ADMIN"], "u1", "u1");
        let user = authz_input(&["USER"], "u1", "u1");

        assert!(ev.evaluate(PolicyModule::Authorization, RULE_ADMIN_ONLY, &admin).unwrap());
        assert!(!ev.evaluate(PolicyModule::Authorization, RULE_ADMIN_ONLY, &user).unwrap());
    }

    #[test]
    fn test_user_only_and_any() {
        let ev = evaluator();
        let user = authz_input(&["USER"], "u1", "u1");
        let nobody = authz_input(&[], "u1", "u1");

        assert!(ev.evaluate(PolicyModule::Authorization, RULE_USER_ONLY, &user).unwrap());
        assert!(ev.evaluate(PolicyModule::Authorization, RULE_ANY, &user).unwrap());
        assert!(!ev.evaluate(PolicyModule::Authorization, RULE_ANY, &nobody).unwrap());
    }

    #[test]
    fn test_admin_or_subject() {
        let ev = evaluator();
        let own = authz_input(&["USER"], "u1", "u1");
        let other = authz_input(&["USER"], "u1", "u2");
        let admin = authz_input(&["ADMIN"], "u1", "u2");

        assert!(ev.evaluate(PolicyModule::Authorization, RULE_ADMIN_OR_SUBJECT, &own).unwrap());
        assert!(!ev.evaluate(PolicyModule::Authorization, RULE_ADMIN_OR_SUBJECT, &other).unwrap());
        assert!(ev.evaluate(PolicyModule::Authorization, RULE_ADMIN_OR_SUBJECT, &admin).unwrap());
    }

    #[test]
    fn test_prepared_engine_keeps_no_input_between_evaluations() {
        let ev = evaluator();
        let admin = authz_input(&["ADMIN"], "u1", "u1");
        let user = authz_input(&["USER"], "u1", "u1");

        for _ in 0..3 {
            assert!(ev.evaluate(PolicyModule::Authorization, RULE_ADMIN_ONLY, &admin).unwrap());
            assert!(!ev.evaluate(PolicyModule::Authorization, RULE_ADMIN_ONLY, &user).unwrap());
        }
    }

    #[test]
    fn test_shared_evaluator_across_threads() {
        let ev = std::sync::Arc::new(evaluator());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ev = std::sync::Arc::clone(&ev);
                std::thread::spawn(move || {
                    let role = if i % 2 == 0 { "ADMIN" } else { "USER" };
                    let input = authz_input(&[role], "u1", "u1");
                    let allowed = ev
                        .evaluate(PolicyModule::Authorization, RULE_ADMIN_ONLY, &input)
                        .unwrap();
                    (role, allowed)
                })
            })
            .collect();

        for handle in handles {
            let (role, allowed) = handle.join().unwrap();
            assert_eq!(allowed, role == "ADMIN");
        }
    }

    #[test]
    fn test_invalid_module_fails_to_compile() {
        let err = PolicyEvaluator::with_modules("package warden.policy\nauth if {", AUTHORIZATION_REGO)
            .unwrap_err();
        assert!(matches!(err, PolicyError::Compile { .. }));
    }

    #[test]
    fn test_unknown_rule_has_no_result() {
        let ev = evaluator();
        let err = ev
            .evaluate(PolicyModule::Authorization, "rule_nobody", &authz_input(&[], "a", "a"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::NoResult { .. }));
    }

    #[test]
    fn test_non_boolean_rule_is_a_type_error() {
        let ev = evaluator();
        let err = ev
            .evaluate(PolicyModule::Authorization, "role_admin", &authz_input(&[], "a", "a"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::Type { .. }));
    }

    #[test]
    fn test_authentication_rejects_garbage_token() {
        let ev = evaluator();
        let input = json!({ "Key": "not a key", "Token": "a.b.c", "ISS": "service project" });
        assert!(!ev.evaluate(PolicyModule::Authentication, RULE_AUTHENTICATE, &input).unwrap());
    }
}
