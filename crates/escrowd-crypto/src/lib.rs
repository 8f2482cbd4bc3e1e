#![deny(missing_docs)]

//! # escrowd-crypto — One-Way Hashing Primitives
//!
//! Everything in Escrowd that must be verified but never read back flows
//! through this crate:
//!
//! - **Delivery-proof codes** (`otp.rs`): 6-digit one-time codes. Only the
//!   SHA-256 digest is persisted; verification is constant-time.
//!
//! - **Credentials** (`credential.rs`): salted password hashes and bearer
//!   token digests for the identity provider.
//!
//! ## Crate Policy
//!
//! - Depends only on `escrowd-core` internally.
//! - Every comparison against a secret uses `subtle::ConstantTimeEq`;
//!   plain `==` over secret material is forbidden here.
//! - Plaintext secrets never implement `Display` and are redacted in
//!   `Debug` output.

pub mod credential;
pub mod otp;

pub use credential::{generate_token, token_digest, PasswordHash};
pub use otp::{OtpCode, OtpHash, OtpIssuer};
