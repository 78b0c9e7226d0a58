//! Token issuance and policy-backed verification.

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult, KeyLookupError, PolicyError};
use crate::keystore::KeyLookup;
use crate::policy::{PolicyEvaluator, PolicyModule, RULE_AUTHENTICATE};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The only signing algorithm issued or accepted.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Issues and verifies bearer tokens and evaluates authorization rules.
///
/// Verified public keys are cached by kid for the life of the process.
/// Keys must not rotate without a restart.
///
/// # Example
///
/// ```ignore
/// let auth = Auth::new(Arc::new(KeyStore::from_dir("zarf/keys")?), "service project")?;
///
/// let token = auth.generate_token(kid, &claims)?;
/// let verified = auth.authenticate(&format!("Bearer {token}"))?;
/// auth.authorize(&verified, RULE_ADMIN_ONLY)?;
/// ```
pub struct Auth {
    key_lookup: Arc<dyn KeyLookup>,
    evaluator: PolicyEvaluator,
    issuer: String,
    cache: RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("issuer", &self.issuer)
            .field("cached_keys", &self.cache.read().len())
            .finish_non_exhaustive()
    }
}

impl Auth {
    /// Creates the service over the built-in rule modules.
    pub fn new(key_lookup: Arc<dyn KeyLookup>, issuer: impl Into<String>) -> AuthResult<Self> {
        Ok(Self::with_evaluator(
            key_lookup,
            issuer,
            PolicyEvaluator::new()?,
        ))
    }

    /// Creates the service with a custom evaluator.
    pub fn with_evaluator(
        key_lookup: Arc<dyn KeyLookup>,
        issuer: impl Into<String>,
        evaluator: PolicyEvaluator,
    ) -> Self {
        Self {
            key_lookup,
            evaluator,
            issuer: issuer.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The issuer tokens must carry.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signs `claims` with the private key registered under `kid`.
    pub fn generate_token(&self, kid: &str, claims: &Claims) -> AuthResult<String> {
        let pem = self.key_lookup.private_key(kid).map_err(|e| match e {
            KeyLookupError::NotFound(_) => AuthError::KeyNotFound {
                kid: kid.to_string(),
            },
            other => AuthError::KeyParse {
                kid: kid.to_string(),
                message: other.to_string(),
            },
        })?;

        let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| AuthError::KeyParse {
            kid: kid.to_string(),
            message: e.to_string(),
        })?;

        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(kid.to_string());

        jsonwebtoken::encode(&header, claims, &key).map_err(AuthError::Signing)
    }

    /// Verifies an `Authorization` header value and returns its claims.
    pub fn authenticate(&self, bearer_header: &str) -> AuthResult<Claims> {
        let parts: Vec<&str> = bearer_header.split(' ').collect();
        let token = match parts.as_slice() {
            ["Bearer", token] if !token.is_empty() => *token,
            _ => return Err(AuthError::MalformedHeader),
        };

        // Header and claims come from one unverified parse; the signature is
        // checked by the authentication rule below.
        let unverified = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&[]),
            &unverified_validation(),
        )
        .map_err(AuthError::TokenParse)?;

        let kid = unverified.header.kid.ok_or(AuthError::MissingKeyId)?;

        let pem = self.public_key_lookup(&kid).map_err(|e| {
            AuthError::AuthenticationFailed(format!("fetching public key: {e}"))
        })?;

        let input = json!({
            "Key": pem,
            "Token": token,
            "ISS": self.issuer,
        });

        match self
            .evaluator
            .evaluate(PolicyModule::Authentication, RULE_AUTHENTICATE, &input)
        {
            Ok(true) => Ok(unverified.claims),
            Ok(false) => Err(AuthError::AuthenticationFailed(
                "policy rejected token".to_string(),
            )),
            Err(e) => Err(AuthError::AuthenticationFailed(e.to_string())),
        }
    }

    /// Evaluates `rule` for the claims' own subject.
    pub fn authorize(&self, claims: &Claims, rule: &str) -> AuthResult<()> {
        self.authorize_user(claims, rule, &claims.subject)
    }

    /// Evaluates `rule` for an action on `user_id`'s resources.
    pub fn authorize_user(&self, claims: &Claims, rule: &str, user_id: &str) -> AuthResult<()> {
        let input = json!({
            "Roles": claims.role_names(),
            "Subject": claims.subject,
            "UserID": user_id,
        });

        let allowed = self
            .evaluator
            .evaluate(PolicyModule::Authorization, rule, &input)
            .map_err(|e: PolicyError| {
                warn!(rule, error = %e, "authorization rule could not be evaluated");
                e
            })?;

        if allowed {
            Ok(())
        } else {
            Err(AuthError::Forbidden {
                roles: claims.role_names().join(","),
                rule: rule.to_string(),
            })
        }
    }

    /// Returns the public PEM for `kid`, fetching it once per process.
    fn public_key_lookup(&self, kid: &str) -> Result<String, KeyLookupError> {
        if let Some(pem) = self.cache.read().get(kid) {
            return Ok(pem.clone());
        }

        // No lock is held across the lookup. Two concurrent misses both
        // fetch; the values are identical so the last insert is harmless.
        let pem = self.key_lookup.public_key(kid)?;
        debug!(kid, "caching public key");
        self.cache.write().insert(kid.to_string(), pem.clone());
        Ok(pem)
    }
}

fn unverified_validation() -> Validation {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{KeyPair, KeyStore};
    use crate::policy::{RULE_ADMIN_ONLY, RULE_USER_ONLY};
    use crate::role::Role;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PRIVATE: &str = include_str!("../tests/fixtures/signing.pem");
    const PUBLIC: &str = include_str!("../tests/fixtures/signing.pub.pem");
    const ISSUER: &str = "service project";

    struct CountingLookup {
        inner: KeyStore,
        public_calls: AtomicUsize,
    }

    impl KeyLookup for CountingLookup {
        fn private_key(&self, kid: &str) -> Result<String, KeyLookupError> {
            self.inner.private_key(kid)
        }

        fn public_key(&self, kid: &str) -> Result<String, KeyLookupError> {
            self.public_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.public_key(kid)
        }
    }

    fn counting_lookup() -> Arc<CountingLookup> {
        let mut inner = KeyStore::new();
        inner.insert("kid-1", KeyPair::new("kid-1", PRIVATE, PUBLIC).unwrap());
        Arc::new(CountingLookup {
            inner,
            public_calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_public_key_is_fetched_once() {
        let lookup = counting_lookup();
        let auth = Auth::new(lookup.clone(), ISSUER).unwrap();

        let first = auth.public_key_lookup("kid-1").unwrap();
        let second = auth.public_key_lookup("kid-1").unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(lookup.public_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_key_is_not_cached() {
        let lookup = counting_lookup();
        let auth = Auth::new(lookup.clone(), ISSUER).unwrap();

        assert!(auth.public_key_lookup("kid-9").is_err());
        assert!(auth.public_key_lookup("kid-9").is_err());
        assert_eq!(lookup.public_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_generate_token_unknown_kid() {
        let auth = Auth::new(counting_lookup(), ISSUER).unwrap();
        let claims = Claims::new("u1", ISSUER, [Role::User], Duration::hours(1));

        let err = auth.generate_token("kid-9", &claims).unwrap_err();
        assert!(matches!(err, AuthError::KeyNotFound { kid } if kid == "kid-9"));
    }

    #[test]
    fn test_token_header_carries_kid() {
        let auth = Auth::new(counting_lookup(), ISSUER).unwrap();
        let claims = Claims::new("u1", ISSUER, [Role::User], Duration::hours(1));

        let token = auth.generate_token("kid-1", &claims).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("kid-1"));
        assert_eq!(header.alg, Algorithm::RS256);
    }

    #[test]
    fn test_authorize_by_role() {
        let auth = Auth::new(counting_lookup(), ISSUER).unwrap();
        let user = Claims::new("u1", ISSUER, [Role::User], Duration::hours(1));

        assert!(matches!(
            auth.authorize(&user, RULE_ADMIN_ONLY),
            Err(AuthError::Forbidden { .. })
        ));
        assert!(auth.authorize(&user, RULE_USER_ONLY).is_ok());
    }
}
