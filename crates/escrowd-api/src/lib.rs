//! # escrowd-api — Axum API Service for Escrowd
//!
//! The HTTP surface over the escrow engines: order lifecycle, dispute
//! resolution, and the identity provider that authenticates every other
//! request.
//!
//! ## API Surface
//!
//! | Prefix         | Module                | Domain                      |
//! |----------------|-----------------------|-----------------------------|
//! | `/users/*`     | [`routes::users`]     | Identity provider           |
//! | `/orders/*`    | [`routes::orders`]    | Escrow order lifecycle      |
//! | `/disputes/*`  | [`routes::disputes`]  | Dispute resolution          |
//! | `/health/*`    | (here)                | Probes, unauthenticated     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! The rate limiter sits inside the auth layer so its buckets key on the
//! authenticated caller — delivery-code guessing is throttled per actor,
//! not per connection.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod identity;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and the register/login endpoints are mounted outside the
/// auth middleware; everything else requires a bearer actor.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::users::router())
        .merge(routes::orders::router())
        .merge(routes::disputes::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(metrics.clone()))
        .layer(axum::Extension(limiter.clone()))
        .with_state(state.clone());

    // Unauthenticated identity routes (registration, login).
    let public = Router::new()
        .merge(routes::users::public_router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(public).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
