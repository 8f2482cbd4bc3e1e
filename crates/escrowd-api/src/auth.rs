//! # Authentication Middleware
//!
//! Opaque bearer tokens with server-side lookup. A token is 32 random
//! bytes issued at registration or login; the server stores only its
//! SHA-256 digest mapped to the owning user. The middleware resolves the
//! presented token to a live user, rejects deactivated accounts, and
//! injects a [`CallerIdentity`] into request extensions for handlers to
//! extract via `FromRequestParts`.
//!
//! Deactivating a user invalidates every outstanding token implicitly:
//! resolution re-reads the user record on each request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::RwLock;

use escrowd_core::{Role, UserId};
use escrowd_crypto::{generate_token, token_digest};
use escrowd_engine::Actor;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::AppState;

// ── Token Store ─────────────────────────────────────────────────────────────

/// Maps bearer-token digests to user ids. Tokens themselves are never
/// stored; a leaked table cannot be replayed.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<HashMap<String, UserId>>>,
}

impl TokenStore {
    /// Create an empty token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for a user and return the plaintext once.
    pub fn issue(&self, user_id: UserId) -> String {
        let token = generate_token();
        self.inner.write().insert(token_digest(&token), user_id);
        token
    }

    /// Resolve a presented token to its owning user id.
    pub fn lookup(&self, token: &str) -> Option<UserId> {
        self.inner.read().get(&token_digest(token)).copied()
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, injected by the auth middleware
/// and available to all route handlers via Axum's `FromRequestParts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's user id.
    pub user_id: UserId,
    /// The caller's role.
    pub role: Role,
}

impl CallerIdentity {
    /// The engine-facing actor for this caller.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller is an administrator.
/// Returns 403 Forbidden otherwise.
pub fn require_admin(caller: &CallerIdentity) -> Result<(), AppError> {
    if caller.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role ADMIN required, caller has {}",
            caller.role
        )))
    }
}

// ── Middleware ──────────────────────────────────────────────────────────────

fn unauthorized(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Extract and validate the bearer token from the Authorization header.
///
/// Resolves the token to a live, active user and injects the resulting
/// [`CallerIdentity`] into request extensions for downstream handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("missing bearer token");
    };

    match state.identity.authenticate(token) {
        Some(user) => {
            request.extensions_mut().insert(CallerIdentity {
                user_id: user.id,
                role: user.role,
            });
            next.run(request).await
        }
        None => unauthorized("invalid or expired bearer token"),
    }
}
