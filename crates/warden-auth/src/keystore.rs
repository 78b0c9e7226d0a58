//! Key material lookup.
//!
//! [`Auth`](crate::Auth) never owns keys itself; it asks a [`KeyLookup`]
//! for PEM text by key identifier. [`KeyStore`] is the in-process
//! implementation, loaded from a directory of PEM files:
//!
//! ```text
//! zarf/keys/
//! ├── 54bb2165-71e1-41a6-af3e-7da4a0e1e2c1.pem      private key (PKCS#1 or PKCS#8)
//! └── 54bb2165-71e1-41a6-af3e-7da4a0e1e2c1.pub.pem  public key
//! ```

use crate::error::KeyLookupError;
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Largest key file accepted, in bytes.
pub const MAX_KEY_FILE_SIZE: u64 = 1024 * 1024;

const PRIVATE_SUFFIX: &str = ".pem";
const PUBLIC_SUFFIX: &str = ".pub.pem";

/// Supplies PEM-encoded RSA key material by key identifier.
pub trait KeyLookup: Send + Sync {
    /// Private key used to sign tokens.
    fn private_key(&self, kid: &str) -> Result<String, KeyLookupError>;

    /// Public key used to verify tokens.
    fn public_key(&self, kid: &str) -> Result<String, KeyLookupError>;
}

/// A private/public PEM pair.
#[derive(Clone)]
pub struct KeyPair {
    private_pem: String,
    public_pem: String,
}

impl KeyPair {
    /// Builds a pair after checking both halves parse as RSA keys.
    pub fn new(
        kid: &str,
        private_pem: impl Into<String>,
        public_pem: impl Into<String>,
    ) -> Result<Self, KeyLookupError> {
        let private_pem = private_pem.into();
        let public_pem = public_pem.into();

        EncodingKey::from_rsa_pem(private_pem.as_bytes()).map_err(|e| {
            KeyLookupError::InvalidKey {
                kid: kid.to_string(),
                message: format!("private key: {e}"),
            }
        })?;
        DecodingKey::from_rsa_pem(public_pem.as_bytes()).map_err(|e| {
            KeyLookupError::InvalidKey {
                kid: kid.to_string(),
                message: format!("public key: {e}"),
            }
        })?;

        Ok(Self {
            private_pem,
            public_pem,
        })
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_pem", &"<redacted>")
            .field("public_pem", &self.public_pem)
            .finish()
    }
}

/// In-memory key store.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    store: HashMap<String, KeyPair>,
}

impl KeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the pair for `kid`.
    pub fn insert(&mut self, kid: impl Into<String>, pair: KeyPair) {
        self.store.insert(kid.into(), pair);
    }

    /// Number of key pairs held.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no keys are held.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Loads every `<kid>.pem` in `dir` along with its `<kid>.pub.pem`.
    ///
    /// A private key without a public half is an error.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, KeyLookupError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| KeyLookupError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut store = Self::new();
        for entry in entries {
            let entry = entry.map_err(|source| KeyLookupError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(PUBLIC_SUFFIX) {
                continue;
            }
            let Some(kid) = name.strip_suffix(PRIVATE_SUFFIX) else {
                continue;
            };

            let private_pem = read_pem(&path)?;
            let public_pem = read_pem(&dir.join(format!("{kid}{PUBLIC_SUFFIX}")))?;
            store.insert(kid, KeyPair::new(kid, private_pem, public_pem)?);
            debug!(kid, "loaded key pair");
        }

        Ok(store)
    }
}

fn read_pem(path: &Path) -> Result<String, KeyLookupError> {
    let io_err = |source| KeyLookupError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = fs::File::open(path).map_err(io_err)?;
    let mut pem = String::new();
    file.take(MAX_KEY_FILE_SIZE + 1)
        .read_to_string(&mut pem)
        .map_err(io_err)?;

    if pem.len() as u64 > MAX_KEY_FILE_SIZE {
        return Err(KeyLookupError::TooLarge {
            path: path.to_path_buf(),
            max: MAX_KEY_FILE_SIZE,
        });
    }
    Ok(pem)
}

impl KeyLookup for KeyStore {
    fn private_key(&self, kid: &str) -> Result<String, KeyLookupError> {
        self.store
            .get(kid)
            .map(|pair| pair.private_pem.clone())
            .ok_or_else(|| KeyLookupError::NotFound(kid.to_string()))
    }

    fn public_key(&self, kid: &str) -> Result<String, KeyLookupError> {
        self.store
            .get(kid)
            .map(|pair| pair.public_pem.clone())
            .ok_or_else(|| KeyLookupError::NotFound(kid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE: &str = include_str!("../tests/fixtures/signing.pem");
    const PUBLIC: &str = include_str!("../tests/fixtures/signing.pub.pem");

    #[test]
    fn test_lookup_by_kid() {
        let mut store = KeyStore::new();
        store.insert("kid-1", KeyPair::new("kid-1", PRIVATE, PUBLIC).unwrap());

        assert_eq!(store.private_key("kid-1").unwrap(), PRIVATE);
        assert_eq!(store.public_key("kid-1").unwrap(), PUBLIC);
        assert!(matches!(
            store.public_key("kid-2"),
            Err(KeyLookupError::NotFound(kid)) if kid == "kid-2"
        ));
    }

    #[test]
    fn test_garbage_pem_is_rejected() {
        let err = KeyPair::new("kid-1", "not a key", PUBLIC).unwrap_err();
        assert!(matches!(err, KeyLookupError::InvalidKey { .. }));
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("kid-1.pem"), PRIVATE).unwrap();
        fs::write(dir.path().join("kid-1.pub.pem"), PUBLIC).unwrap();
        fs::write(dir.path().join("README"), "keys live here").unwrap();

        let store = KeyStore::from_dir(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.public_key("kid-1").unwrap(), PUBLIC);
    }

    #[test]
    fn test_from_dir_requires_public_half() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("kid-1.pem"), PRIVATE).unwrap();

        let err = KeyStore::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, KeyLookupError::Io { .. }));
    }
}
