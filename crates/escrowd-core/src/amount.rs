//! # Monetary Amounts
//!
//! Validated decimal-string amounts. Amounts are stored and transmitted as
//! strings to preserve precision; floating-point monetary values are
//! unrepresentable in this type.
//!
//! ## Security Invariant
//!
//! Financial amounts must never be represented as floating-point numbers.
//! String storage ensures no precision loss during serialization, and
//! construction-time validation ensures every stored amount is strictly
//! positive.

use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// Maximum digits before the decimal point. Matches DECIMAL(20, 8) storage.
const MAX_INTEGER_DIGITS: usize = 20;

/// Maximum digits after the decimal point.
const MAX_FRACTION_DIGITS: usize = 8;

/// A strictly positive decimal amount, e.g. `"100.00"` or `"0.00000001"`.
///
/// Construct via [`Amount::new`], which validates the format. The inner
/// string is immutable once validated and serializes transparently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Amount {
    /// Create a validated amount from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidInput`] if the string is not a plain
    /// decimal (`digits` or `digits.digits`), exceeds 20 integer or 8
    /// fraction digits, or is not strictly positive.
    pub fn new(value: impl Into<String>) -> Result<Self, EscrowError> {
        let s = value.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Return the amount as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), EscrowError> {
        let reject = |reason: &str| {
            Err(EscrowError::InvalidInput(format!(
                "invalid amount \"{s}\": {reason}"
            )))
        };

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (s, None),
        };

        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return reject("expected decimal digits");
        }
        if int_part.len() > MAX_INTEGER_DIGITS {
            return reject("too many integer digits");
        }
        if let Some(frac) = frac_part {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return reject("expected decimal digits after the point");
            }
            if frac.len() > MAX_FRACTION_DIGITS {
                return reject("too many fraction digits");
            }
        }

        // Strictly positive: at least one nonzero digit somewhere.
        let has_value = int_part
            .bytes()
            .chain(frac_part.unwrap_or("").bytes())
            .any(|b| b != b'0');
        if !has_value {
            return reject("amount must be positive");
        }

        Ok(())
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Amount {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
