//! # User Records
//!
//! The registered principals of the marketplace. Users are created through
//! the identity provider at the API layer and referenced by the engines for
//! party validation; they are never deleted, only deactivated.

use serde::{Deserialize, Serialize};

use escrowd_core::{Role, Timestamp, UserId};
use escrowd_crypto::PasswordHash;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Phone number; unique across the ledger.
    pub phone: String,
    /// Email address; unique across the ledger when present.
    pub email: Option<String>,
    /// Salted one-way credential hash. Never serialized to API responses;
    /// response DTOs are built field-by-field and do not carry this.
    pub password_hash: PasswordHash,
    /// The user's role.
    pub role: Role,
    /// Deactivated users keep their audit trail but cannot authenticate.
    pub is_active: bool,
    /// When the user registered.
    pub created_at: Timestamp,
}

impl User {
    /// Create a new active user.
    pub fn new(
        name: String,
        phone: String,
        email: Option<String>,
        password_hash: PasswordHash,
        role: Role,
        now: Timestamp,
    ) -> Self {
        Self {
            id: UserId::new(),
            name,
            phone,
            email,
            password_hash,
            role,
            is_active: true,
            created_at: now,
        }
    }

    /// Whether this user can be the selling party of a new order.
    pub fn can_sell(&self) -> bool {
        self.is_active && self.role.can_sell()
    }
}
