//! # Escrow Order Endpoints
//!
//! ## Endpoints
//!
//! - `POST /orders` — create an order (buyer)
//! - `GET  /orders` — list visible orders
//! - `GET  /orders/:id` — get one order
//! - `POST /orders/:id/pay` — lock payment into escrow (buyer)
//! - `POST /orders/:id/confirm` — prove delivery with the code (buyer)
//! - `POST /orders/:id/release` — release funds (buyer or admin)
//! - `POST /orders/:id/cancel` — cancel before payment (party or admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use escrowd_core::{Amount, OrderId, Timestamp, UserId};
use escrowd_engine::{NewOrder, Order, OrderStatus};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to create a new escrow order.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// The selling party.
    pub seller_id: Uuid,
    /// Amount to escrow, as a decimal string (e.g., "100.00").
    pub amount: String,
    /// Optional item description.
    pub item_name: Option<String>,
    /// Optional caller-supplied delivery-proof code (6 digits). When
    /// omitted the server generates one and returns it once.
    pub otp: Option<String>,
}

impl Validate for CreateOrderRequest {
    fn validate(&self) -> Result<(), String> {
        if self.amount.trim().is_empty() {
            return Err("amount must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to record payment.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayOrderRequest {
    /// Opaque payment rail label (e.g., "Bank Transfer").
    pub payment_method: String,
    /// Opaque payment reference for audit.
    pub payment_ref: Option<String>,
}

impl Validate for PayOrderRequest {
    fn validate(&self) -> Result<(), String> {
        if self.payment_method.trim().is_empty() {
            return Err("paymentMethod must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to prove delivery.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmDeliveryRequest {
    /// The delivery-proof code the buyer received out-of-band.
    pub otp: String,
}

impl Validate for ConfirmDeliveryRequest {
    fn validate(&self) -> Result<(), String> {
        if self.otp.trim().is_empty() {
            return Err("otp must not be empty".to_string());
        }
        Ok(())
    }
}

/// An order as presented by the API. The delivery-code hash is never
/// included.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    /// Order id.
    pub id: Uuid,
    /// The paying party.
    pub buyer_id: Uuid,
    /// The receiving party.
    pub seller_id: Uuid,
    /// Escrowed amount.
    #[schema(value_type = String)]
    pub amount: Amount,
    /// Item description.
    pub item_name: Option<String>,
    /// Lifecycle status.
    #[schema(value_type = String)]
    pub status: OrderStatus,
    /// Payment rail label, present once paid.
    pub payment_method: Option<String>,
    /// Payment reference, present once paid if supplied.
    pub payment_ref: Option<String>,
    /// When payment locked.
    #[schema(value_type = Option<String>)]
    pub paid_at: Option<Timestamp>,
    /// When funds released.
    #[schema(value_type = Option<String>)]
    pub released_at: Option<Timestamp>,
    /// Creation time.
    #[schema(value_type = String)]
    pub created_at: Timestamp,
    /// Last change time.
    #[schema(value_type = String)]
    pub updated_at: Timestamp,
}

impl From<&Order> for OrderBody {
    fn from(order: &Order) -> Self {
        Self {
            id: *order.id.as_uuid(),
            buyer_id: *order.buyer_id.as_uuid(),
            seller_id: *order.seller_id.as_uuid(),
            amount: order.amount.clone(),
            item_name: order.item_name.clone(),
            status: order.status,
            payment_method: order.payment_method.clone(),
            payment_ref: order.payment_ref.clone(),
            paid_at: order.paid_at,
            released_at: order.released_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Order-creation response. The plaintext code appears only when the
/// server generated it; a caller-supplied code is never echoed back.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    /// The created order.
    pub order: OrderBody,
    /// The server-generated delivery-proof code, shown exactly once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/pay", post(pay_order))
        .route("/orders/:id/confirm", post(confirm_delivery))
        .route("/orders/:id/release", post(release_funds))
        .route("/orders/:id/cancel", post(cancel_order))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /orders — Create a new escrow order.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 403, description = "Caller is not a buyer", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let created = state.orders.create_order(
        &caller.actor(),
        NewOrder {
            seller_id: UserId::from_uuid(req.seller_id),
            amount: req.amount,
            item_name: req.item_name,
            otp: req.otp,
        },
    )?;
    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order: (&created.order).into(),
            otp: created.otp.map(|code| code.reveal().to_string()),
        }),
    ))
}

/// GET /orders — List orders visible to the caller.
#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "Visible orders, newest first", body = Vec<OrderBody>),
    ),
    tag = "orders"
)]
pub async fn list_orders(State(state): State<AppState>, caller: CallerIdentity) -> Json<Vec<OrderBody>> {
    let orders = state.orders.list_orders(&caller.actor());
    Json(orders.iter().map(OrderBody::from).collect())
}

/// GET /orders/:id — Get a single order.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = OrderBody),
        (status = 403, description = "Not a party to the order", body = crate::error::ErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderBody>, AppError> {
    let order = state
        .orders
        .get_order(&caller.actor(), OrderId::from_uuid(id))?;
    Ok(Json((&order).into()))
}

/// POST /orders/:id/pay — Record payment, locking funds into escrow.
#[utoipa::path(
    post,
    path = "/orders/{id}/pay",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = PayOrderRequest,
    responses(
        (status = 200, description = "Payment locked", body = OrderBody),
        (status = 400, description = "Order is not awaiting payment", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not the buyer", body = crate::error::ErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody),
        (status = 409, description = "Lost a concurrent update race", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub async fn pay_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<PayOrderRequest>, JsonRejection>,
) -> Result<Json<OrderBody>, AppError> {
    let req = extract_validated_json(body)?;
    let order = state.orders.mark_as_paid(
        &caller.actor(),
        OrderId::from_uuid(id),
        &req.payment_method,
        req.payment_ref,
    )?;
    Ok(Json((&order).into()))
}

/// POST /orders/:id/confirm — Prove delivery with the one-time code.
#[utoipa::path(
    post,
    path = "/orders/{id}/confirm",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ConfirmDeliveryRequest,
    responses(
        (status = 200, description = "Delivery confirmed", body = OrderBody),
        (status = 400, description = "Code mismatch or wrong status", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not the buyer", body = crate::error::ErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub async fn confirm_delivery(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ConfirmDeliveryRequest>, JsonRejection>,
) -> Result<Json<OrderBody>, AppError> {
    let req = extract_validated_json(body)?;
    let order =
        state
            .orders
            .confirm_delivery(&caller.actor(), OrderId::from_uuid(id), &req.otp)?;
    Ok(Json((&order).into()))
}

/// POST /orders/:id/release — Release escrowed funds to the seller.
#[utoipa::path(
    post,
    path = "/orders/{id}/release",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Funds released", body = OrderBody),
        (status = 400, description = "Order is not releasable", body = crate::error::ErrorBody),
        (status = 403, description = "Caller may not release", body = crate::error::ErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody),
        (status = 409, description = "Lost a concurrent update race", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub async fn release_funds(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderBody>, AppError> {
    let order = state
        .orders
        .release_funds(&caller.actor(), OrderId::from_uuid(id))?;
    Ok(Json((&order).into()))
}

/// POST /orders/:id/cancel — Cancel before funds lock.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = OrderBody),
        (status = 400, description = "Cancellation window has closed", body = crate::error::ErrorBody),
        (status = 403, description = "Not a party to the order", body = crate::error::ErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderBody>, AppError> {
    let order = state
        .orders
        .cancel_order(&caller.actor(), OrderId::from_uuid(id))?;
    Ok(Json((&order).into()))
}
