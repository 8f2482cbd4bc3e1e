//! # Identity Provider
//!
//! Registration, login, and account administration over the ledger's user
//! records. This is the collaborator that authenticates a bearer
//! credential and supplies `{actor_id, role}` before the escrow engines
//! are invoked; the engines themselves never see passwords or tokens.

use std::sync::Arc;

use escrowd_core::{Clock, EscrowError, Role, UserId};
use escrowd_crypto::PasswordHash;
use escrowd_engine::{Ledger, User};

use crate::auth::TokenStore;

/// Parameters for registering a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Phone number, unique.
    pub phone: String,
    /// Optional email, unique when present.
    pub email: Option<String>,
    /// Plaintext password; hashed before storage.
    pub password: String,
    /// Requested role. Defaults to BUYER; ADMIN cannot be self-assigned.
    pub role: Option<Role>,
}

/// The identity provider service.
#[derive(Clone)]
pub struct IdentityService {
    ledger: Ledger,
    tokens: TokenStore,
    clock: Arc<dyn Clock>,
}

impl IdentityService {
    /// Create the service over the given ledger, token store, and clock.
    pub fn new(ledger: Ledger, tokens: TokenStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            tokens,
            clock,
        }
    }

    /// Register a new user and issue their first bearer token.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for missing fields, an ADMIN role request, or a
    /// duplicate phone/email.
    pub fn register(&self, new: NewUser) -> Result<(User, String), EscrowError> {
        let name = new.name.trim();
        let phone = new.phone.trim();
        if name.is_empty() || phone.is_empty() || new.password.is_empty() {
            return Err(EscrowError::InvalidInput(
                "name, phone, and password are required".to_string(),
            ));
        }
        let role = new.role.unwrap_or(Role::Buyer);
        if role == Role::Admin {
            return Err(EscrowError::InvalidInput(
                "administrator accounts cannot be self-registered".to_string(),
            ));
        }

        let user = User::new(
            name.to_string(),
            phone.to_string(),
            new.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            PasswordHash::new(&new.password),
            role,
            self.clock.now(),
        );
        self.ledger.insert_user(user.clone())?;
        tracing::info!(user = %user.id, role = %user.role, "user registered");

        let token = self.tokens.issue(user.id);
        Ok((user, token))
    }

    /// Authenticate by phone-or-email identifier and password, issuing a
    /// fresh bearer token.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for unknown identifiers, wrong passwords, and
    /// deactivated accounts. The three cases share one message so the
    /// response does not reveal which identifiers exist.
    pub fn login(&self, identifier: &str, password: &str) -> Result<(User, String), EscrowError> {
        let invalid = || EscrowError::Unauthorized("invalid credentials".to_string());

        let user = self
            .ledger
            .find_user_by_identifier(identifier.trim())
            .ok_or_else(invalid)?;
        if !user.password_hash.verify(password) {
            return Err(invalid());
        }
        if !user.is_active {
            return Err(invalid());
        }

        let token = self.tokens.issue(user.id);
        Ok((user, token))
    }

    /// Resolve a bearer token to a live, active user.
    pub fn authenticate(&self, token: &str) -> Option<User> {
        let user_id = self.tokens.lookup(token)?;
        self.ledger.get_user(&user_id).filter(|u| u.is_active)
    }

    /// Fetch a user by id.
    pub fn get_user(&self, id: &UserId) -> Result<User, EscrowError> {
        self.ledger
            .get_user(id)
            .ok_or_else(|| EscrowError::user_not_found(id))
    }

    /// List all users. Callers gate this behind the admin role.
    pub fn list_users(&self) -> Vec<User> {
        let mut users = self.ledger.list_users();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }

    /// Deactivate a user. Their outstanding tokens stop resolving on the
    /// next request; the record itself is kept for the audit trail.
    pub fn deactivate(&self, id: &UserId) -> Result<User, EscrowError> {
        let user = self
            .ledger
            .update_user(id, |u| u.is_active = false)
            .ok_or_else(|| EscrowError::user_not_found(id))?;
        tracing::info!(user = %user.id, "user deactivated");
        Ok(user)
    }

    /// Create an administrator account directly. Not reachable through the
    /// HTTP surface; used by deployment bootstrap and tests.
    pub fn bootstrap_admin(
        &self,
        name: &str,
        phone: &str,
        password: &str,
    ) -> Result<User, EscrowError> {
        let user = User::new(
            name.to_string(),
            phone.to_string(),
            None,
            PasswordHash::new(password),
            Role::Admin,
            self.clock.now(),
        );
        self.ledger.insert_user(user.clone())?;
        tracing::info!(user = %user.id, "administrator bootstrapped");
        Ok(user)
    }
}
