//! # Roles
//!
//! The closed role vocabulary for Escrowd principals. Authorization decisions
//! evaluate two independent dimensions — role membership and resource
//! ownership — and this enum is the entirety of the first dimension.
//!
//! Roles are deliberately NOT ordered: an admin is not a "bigger seller",
//! and a seller is not a "bigger buyer". Each capability is granted by
//! explicit match, never by privilege comparison.

use serde::{Deserialize, Serialize};

/// The role of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Creates orders, locks payment, confirms delivery, releases funds.
    Buyer,
    /// Receives escrowed funds on release; may cancel or dispute own orders.
    Seller,
    /// Arbitrates disputes and may override order progression for support.
    Admin,
}

impl Role {
    /// The canonical string name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "BUYER",
            Self::Seller => "SELLER",
            Self::Admin => "ADMIN",
        }
    }

    /// Whether this role carries administrator capability.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether a user with this role can be the selling party of an order.
    pub fn can_sell(&self) -> bool {
        matches!(self, Self::Seller)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUYER" => Ok(Self::Buyer),
            "SELLER" => Ok(Self::Seller),
            "ADMIN" => Ok(Self::Admin),
            other => Err(format!("unknown role: \"{other}\"")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_all_variants() {
        assert_eq!(Role::Buyer.as_str(), "BUYER");
        assert_eq!(Role::Seller.as_str(), "SELLER");
        assert_eq!(Role::Admin.as_str(), "ADMIN");
    }

    #[test]
    fn wire_format_is_screaming_snake() {
        assert_eq!(serde_json::to_string(&Role::Buyer).unwrap(), "\"BUYER\"");
        let back: Role = serde_json::from_str("\"SELLER\"").unwrap();
        assert_eq!(back, Role::Seller);
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert!("MODERATOR".parse::<Role>().is_err());
        assert!("buyer".parse::<Role>().is_err());
    }

    #[test]
    fn capability_predicates() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Buyer.is_admin());
        assert!(Role::Seller.can_sell());
        assert!(!Role::Buyer.can_sell());
        assert!(!Role::Admin.can_sell());
    }
}
