//! Salted password digests.
//!
//! Each account gets 16 random salt bytes; the stored digest is
//! `SHA-256(salt || raw_password)`. Salts are generated per account rather
//! than derived from the username, so two accounts with the same password
//! never share a digest.

use std::fmt;

use sha2::{Digest, Sha256};

/// Length of the per-account salt in bytes.
pub const SALT_LEN: usize = 16;
/// Length of the stored digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Errors raised when rebuilding a digest from stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordDigestError {
    /// The stored salt had an unexpected length.
    #[error("password salt must be {expected} bytes, got {actual}")]
    SaltLength {
        /// Required length.
        expected: usize,
        /// Length found in storage.
        actual: usize,
    },
    /// The stored digest had an unexpected length.
    #[error("password digest must be {expected} bytes, got {actual}")]
    DigestLength {
        /// Required length.
        expected: usize,
        /// Length found in storage.
        actual: usize,
    },
}

/// Salt plus digest pair persisted for every account.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    salt: [u8; SALT_LEN],
    digest: [u8; DIGEST_LEN],
}

impl PasswordDigest {
    /// Derive a digest for `raw_password` with a freshly generated salt.
    pub fn generate(raw_password: &str) -> Self {
        Self::with_salt(rand::random(), raw_password)
    }

    /// Derive a digest for `raw_password` using an explicit salt.
    pub fn with_salt(salt: [u8; SALT_LEN], raw_password: &str) -> Self {
        Self {
            salt,
            digest: digest(&salt, raw_password),
        }
    }

    /// Rebuild a digest from the byte columns stored by persistence adapters.
    pub fn from_stored(salt: &[u8], digest: &[u8]) -> Result<Self, PasswordDigestError> {
        let salt_bytes: [u8; SALT_LEN] =
            salt.try_into().map_err(|_| PasswordDigestError::SaltLength {
                expected: SALT_LEN,
                actual: salt.len(),
            })?;
        let digest_bytes: [u8; DIGEST_LEN] =
            digest
                .try_into()
                .map_err(|_| PasswordDigestError::DigestLength {
                    expected: DIGEST_LEN,
                    actual: digest.len(),
                })?;
        Ok(Self {
            salt: salt_bytes,
            digest: digest_bytes,
        })
    }

    /// Per-account salt bytes.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// Stored digest bytes.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Check a login attempt against this digest.
    ///
    /// The comparison touches every byte regardless of where the first
    /// mismatch occurs.
    pub fn matches(&self, raw_password: &str) -> bool {
        let candidate = digest(&self.salt, raw_password);
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordDigest")
            .field("salt", &hex::encode(self.salt))
            .field("digest", &"<redacted>")
            .finish()
    }
}

fn digest(salt: &[u8; SALT_LEN], raw_password: &str) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(raw_password.as_bytes());
    hasher.finalize().into()
}
