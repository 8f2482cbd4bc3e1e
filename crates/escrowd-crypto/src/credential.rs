//! # Credential Hashing
//!
//! Salted one-way password hashes and bearer-token digests for the
//! identity provider. Stored form for passwords is `salt_hex$digest_hex`
//! where `digest = SHA-256(salt ‖ password)`; bearer tokens are stored only
//! as their SHA-256 digest, keyed to the owning user.
//!
//! ## Security Invariant
//!
//! Verification compares digests with `subtle::ConstantTimeEq`. Neither the
//! plaintext password nor the issued token is ever persisted.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Bytes of random salt prepended to each password before hashing.
const SALT_BYTES: usize = 16;

/// Bytes of entropy in an issued bearer token.
const TOKEN_BYTES: usize = 32;

/// A salted one-way password hash, stored as `salt_hex$digest_hex`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a password under a fresh random salt.
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt);
        Self(format!(
            "{}${}",
            hex(&salt),
            hex(&salted_digest(&salt, password))
        ))
    }

    /// Verify a candidate password against this hash in constant time.
    ///
    /// A malformed stored hash verifies as false rather than panicking;
    /// records can only reach that shape through store corruption.
    pub fn verify(&self, candidate: &str) -> bool {
        let Some((salt_hex, digest_hex)) = self.0.split_once('$') else {
            return false;
        };
        let Some(salt) = unhex(salt_hex) else {
            return false;
        };
        let candidate_hex = hex(&salted_digest(&salt, candidate));
        digest_hex
            .as_bytes()
            .ct_eq(candidate_hex.as_bytes())
            .into()
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}

/// Issue a fresh opaque bearer token: 32 random bytes, lowercase hex.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex(&bytes)
}

/// The storage digest of a bearer token. The server keeps only this; a
/// leaked token table cannot be replayed without inverting SHA-256.
pub fn token_digest(token: &str) -> String {
    hex(&Sha256::digest(token.as_bytes()))
}

fn salted_digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

fn unhex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = PasswordHash::new("correct horse battery staple");
        assert!(hash.verify("correct horse battery staple"));
        assert!(!hash.verify("correct horse battery stapler"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn same_password_hashes_differently() {
        // Fresh salt per hash: equal passwords must not produce equal records.
        let a = PasswordHash::new("hunter2");
        let b = PasswordHash::new("hunter2");
        assert_ne!(a, b);
        assert!(a.verify("hunter2"));
        assert!(b.verify("hunter2"));
    }

    #[test]
    fn malformed_stored_hash_verifies_false() {
        let broken = PasswordHash("no-dollar-separator".to_string());
        assert!(!broken.verify("anything"));
        let bad_salt = PasswordHash("zz$aabb".to_string());
        assert!(!bad_salt.verify("anything"));
    }

    #[test]
    fn debug_output_is_redacted() {
        let hash = PasswordHash::new("hunter2");
        assert!(!format!("{hash:?}").contains('$'));
    }

    #[test]
    fn tokens_are_unique_and_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_digest_is_deterministic() {
        let token = generate_token();
        assert_eq!(token_digest(&token), token_digest(&token));
        assert_ne!(token_digest(&token), token_digest("other"));
    }
}
