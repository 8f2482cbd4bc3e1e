//! # Delivery-Proof Codes
//!
//! Issues the one-time code a seller hands to the buyer out-of-band, and
//! verifies a presented code against the stored one-way hash. The plaintext
//! code exists only in the order-creation response; every later comparison
//! runs against the SHA-256 digest.
//!
//! ## Security Invariant
//!
//! Verification compares full digests with `subtle::ConstantTimeEq`, so
//! timing is not proportional to a byte-by-byte mismatch of the presented
//! code.

use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use escrowd_core::EscrowError;

/// Number of digits in a delivery-proof code.
pub const OTP_DIGITS: usize = 6;

/// A plaintext 6-digit delivery-proof code.
///
/// Construct via [`OtpCode::new`] (validating a caller-supplied code) or
/// [`OtpIssuer::issue`] (server-generated). The plaintext is deliberately
/// not `Display` and redacted in `Debug`; it leaves the process only in
/// the order-creation response for server-generated codes.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Validate a caller-supplied code: exactly six ASCII digits.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidInput`] otherwise. The rejected value
    /// is not echoed into the error.
    pub fn new(value: impl Into<String>) -> Result<Self, EscrowError> {
        let s = value.into();
        if s.len() != OTP_DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EscrowError::InvalidInput(format!(
                "delivery code must be exactly {OTP_DIGITS} digits"
            )));
        }
        Ok(Self(s))
    }

    /// Expose the plaintext code. Used once, to return a server-generated
    /// code to its creator.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpCode([REDACTED])")
    }
}

/// The SHA-256 digest of a delivery-proof code, stored on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpHash(String);

impl OtpHash {
    /// Compute the digest of a code.
    pub fn from_code(code: &OtpCode) -> Self {
        Self(hex_digest(code.0.as_bytes()))
    }

    /// Verify a presented code against this hash in constant time.
    pub fn verify(&self, presented: &OtpCode) -> bool {
        let candidate = hex_digest(presented.0.as_bytes());
        // Both sides are 64-char hex of equal length; ct_eq over the full
        // strings keeps timing independent of where they diverge.
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// The digest as a lowercase hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Issues server-generated delivery-proof codes.
///
/// Codes are drawn uniformly from `100000..=999999` using the operating
/// system RNG: always six digits, never a leading zero, matching the
/// format buyers are told to expect.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtpIssuer;

impl OtpIssuer {
    /// Create an issuer backed by the OS RNG.
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh code and its storage hash.
    pub fn issue(&self) -> (OtpCode, OtpHash) {
        let value: u32 = OsRng.gen_range(100_000..=999_999);
        let code = OtpCode(value.to_string());
        let hash = OtpHash::from_code(&code);
        (code, hash)
    }
}

fn hex_digest(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
