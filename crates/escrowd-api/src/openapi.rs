//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Escrowd API",
        version = "0.3.2",
        description = "Peer-to-peer trade escrow: orders with payment lock, delivery-proof confirmation, fund release, and administrator-arbitrated disputes.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Users
        crate::routes::users::register,
        crate::routes::users::login,
        crate::routes::users::me,
        crate::routes::users::list_users,
        crate::routes::users::deactivate_user,
        // Orders
        crate::routes::orders::create_order,
        crate::routes::orders::list_orders,
        crate::routes::orders::get_order,
        crate::routes::orders::pay_order,
        crate::routes::orders::confirm_delivery,
        crate::routes::orders::release_funds,
        crate::routes::orders::cancel_order,
        // Disputes
        crate::routes::disputes::open_dispute,
        crate::routes::disputes::list_disputes,
        crate::routes::disputes::get_dispute,
        crate::routes::disputes::resolve_dispute,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // User DTOs
        crate::routes::users::RegisterRequest,
        crate::routes::users::LoginRequest,
        crate::routes::users::UserBody,
        crate::routes::users::AuthResponse,
        // Order DTOs
        crate::routes::orders::CreateOrderRequest,
        crate::routes::orders::PayOrderRequest,
        crate::routes::orders::ConfirmDeliveryRequest,
        crate::routes::orders::OrderBody,
        crate::routes::orders::CreateOrderResponse,
        // Dispute DTOs
        crate::routes::disputes::OpenDisputeRequest,
        crate::routes::disputes::ResolveDisputeRequest,
        crate::routes::disputes::DisputeBody,
    )),
    tags(
        (name = "users", description = "Identity provider — registration, login, account admin"),
        (name = "orders", description = "Escrow order lifecycle"),
        (name = "disputes", description = "Dispute resolution"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router, serving the JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
