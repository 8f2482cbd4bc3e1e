//! # Identity Endpoints
//!
//! Registration and login are the only unauthenticated routes in the API;
//! they live in [`public_router`]. Everything else requires a bearer
//! actor.
//!
//! ## Endpoints
//!
//! - `POST /users/register` — register, receive first bearer token
//! - `POST /users/login` — authenticate, receive fresh bearer token
//! - `GET  /users/me` — the caller's own record
//! - `GET  /users` — list users (admin)
//! - `POST /users/:id/deactivate` — deactivate an account (admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use escrowd_core::{EscrowError, Role, Timestamp, UserId};
use escrowd_engine::User;

use crate::auth::{require_admin, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::identity::NewUser;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to register a new user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Phone number; must be unique.
    pub phone: String,
    /// Optional email; must be unique when present.
    pub email: Option<String>,
    /// Plaintext password; stored only as a salted hash.
    pub password: String,
    /// Requested role: BUYER (default) or SELLER.
    #[schema(value_type = Option<String>)]
    pub role: Option<Role>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.phone.trim().is_empty() {
            return Err("phone must not be empty".to_string());
        }
        if self.password.len() < 8 {
            return Err("password must be at least 8 characters".to_string());
        }
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err("email is not a valid address".to_string());
            }
        }
        Ok(())
    }
}

/// Request to log in with a phone or email identifier.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Phone number or email address.
    pub identifier: String,
    /// Plaintext password.
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.identifier.trim().is_empty() {
            return Err("identifier must not be empty".to_string());
        }
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        Ok(())
    }
}

/// A user as presented by the API. Carries no credential material.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    /// User id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: String,
    /// Email address, if registered.
    pub email: Option<String>,
    /// Role.
    #[schema(value_type = String)]
    pub role: Role,
    /// Whether the account can authenticate.
    pub is_active: bool,
    /// Registration time.
    #[schema(value_type = String)]
    pub created_at: Timestamp,
}

impl From<&User> for UserBody {
    fn from(user: &User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Registration/login response: the user plus a bearer token.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// The authenticated user.
    pub user: UserBody,
    /// The bearer token. Shown once; the server stores only its digest.
    pub token: String,
}

// ── Router ──────────────────────────────────────────────────────────

/// Unauthenticated identity routes.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
}

/// Authenticated identity routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(me))
        .route("/users/:id/deactivate", post(deactivate_user))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /users/register — Register a new user.
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let (user, token) = state.identity.register(NewUser {
        name: req.name,
        phone: req.phone,
        email: req.email,
        password: req.password,
        role: req.role,
    })?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: (&user).into(),
            token,
        }),
    ))
}

/// POST /users/login — Authenticate and receive a fresh token.
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let (user, token) = state
        .identity
        .login(&req.identifier, &req.password)
        .map_err(|err| match err {
            // Login failures are authentication (401), not authorization.
            EscrowError::Unauthorized(msg) => AppError::Unauthorized(msg),
            other => other.into(),
        })?;
    Ok(Json(AuthResponse {
        user: (&user).into(),
        token,
    }))
}

/// GET /users/me — The caller's own record.
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Caller's user record", body = UserBody),
    ),
    tag = "users"
)]
pub async fn me(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<UserBody>, AppError> {
    let user = state.identity.get_user(&caller.user_id)?;
    Ok(Json((&user).into()))
}

/// GET /users — List all users. Administrator only.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = Vec<UserBody>),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<UserBody>>, AppError> {
    require_admin(&caller)?;
    let users = state.identity.list_users();
    Ok(Json(users.iter().map(UserBody::from).collect()))
}

/// POST /users/:id/deactivate — Deactivate an account. Administrator only.
#[utoipa::path(
    post,
    path = "/users/{id}/deactivate",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated", body = UserBody),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<UserBody>, AppError> {
    require_admin(&caller)?;
    let user = state.identity.deactivate(&UserId::from_uuid(id))?;
    Ok(Json((&user).into()))
}
