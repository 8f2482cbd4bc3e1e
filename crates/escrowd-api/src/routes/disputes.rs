//! # Dispute Endpoints
//!
//! ## Endpoints
//!
//! - `POST /disputes` — open a dispute (buyer or seller of the order)
//! - `GET  /disputes` — list visible disputes
//! - `GET  /disputes/:id` — get one dispute
//! - `POST /disputes/:id/resolve` — resolve with REFUND or RELEASE (admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use escrowd_core::{DisputeId, OrderId, Timestamp};
use escrowd_engine::{Dispute, DisputeStatus};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to open a dispute.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenDisputeRequest {
    /// The disputed order.
    pub order_id: Uuid,
    /// Why the dispute is being opened.
    pub reason: String,
}

impl Validate for OpenDisputeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to resolve a dispute.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDisputeRequest {
    /// The decision: `REFUND` or `RELEASE`.
    pub decision: String,
    /// Optional note recorded with the resolution.
    pub resolution_note: Option<String>,
}

impl Validate for ResolveDisputeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.decision.trim().is_empty() {
            return Err("decision must not be empty".to_string());
        }
        Ok(())
    }
}

/// A dispute as presented by the API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisputeBody {
    /// Dispute id.
    pub id: Uuid,
    /// The disputed order.
    pub order_id: Uuid,
    /// The party that opened the dispute.
    pub created_by: Uuid,
    /// The stated reason.
    pub reason: String,
    /// Current status.
    #[schema(value_type = String)]
    pub status: DisputeStatus,
    /// The administrator's resolution note, once resolved.
    pub resolution_note: Option<String>,
    /// When the dispute was resolved.
    #[schema(value_type = Option<String>)]
    pub resolved_at: Option<Timestamp>,
    /// When the dispute was opened.
    #[schema(value_type = String)]
    pub created_at: Timestamp,
}

impl From<&Dispute> for DisputeBody {
    fn from(dispute: &Dispute) -> Self {
        Self {
            id: *dispute.id.as_uuid(),
            order_id: *dispute.order_id.as_uuid(),
            created_by: *dispute.created_by.as_uuid(),
            reason: dispute.reason.clone(),
            status: dispute.status,
            resolution_note: dispute.resolution_note.clone(),
            resolved_at: dispute.resolved_at,
            created_at: dispute.created_at,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the disputes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/disputes", get(list_disputes).post(open_dispute))
        .route("/disputes/:id", get(get_dispute))
        .route("/disputes/:id/resolve", post(resolve_dispute))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /disputes — Open a dispute on an order.
#[utoipa::path(
    post,
    path = "/disputes",
    request_body = OpenDisputeRequest,
    responses(
        (status = 201, description = "Dispute opened; order flagged DISPUTED", body = DisputeBody),
        (status = 400, description = "Order not disputable, or dispute already open", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a party to the order", body = crate::error::ErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn open_dispute(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<OpenDisputeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DisputeBody>), AppError> {
    let req = extract_validated_json(body)?;
    let dispute = state.disputes.open_dispute(
        &caller.actor(),
        OrderId::from_uuid(req.order_id),
        &req.reason,
    )?;
    Ok((StatusCode::CREATED, Json((&dispute).into())))
}

/// GET /disputes — List disputes visible to the caller.
#[utoipa::path(
    get,
    path = "/disputes",
    responses(
        (status = 200, description = "Visible disputes, newest first", body = Vec<DisputeBody>),
    ),
    tag = "disputes"
)]
pub async fn list_disputes(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Json<Vec<DisputeBody>> {
    let disputes = state.disputes.list_disputes(&caller.actor());
    Json(disputes.iter().map(DisputeBody::from).collect())
}

/// GET /disputes/:id — Get a single dispute.
#[utoipa::path(
    get,
    path = "/disputes/{id}",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    responses(
        (status = 200, description = "Dispute found", body = DisputeBody),
        (status = 403, description = "Not a party to the disputed order", body = crate::error::ErrorBody),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn get_dispute(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<DisputeBody>, AppError> {
    let dispute = state
        .disputes
        .get_dispute(&caller.actor(), DisputeId::from_uuid(id))?;
    Ok(Json((&dispute).into()))
}

/// POST /disputes/:id/resolve — Resolve a dispute. Administrator only.
#[utoipa::path(
    post,
    path = "/disputes/{id}/resolve",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = ResolveDisputeRequest,
    responses(
        (status = 200, description = "Dispute resolved; order finalized atomically", body = DisputeBody),
        (status = 400, description = "Already resolved, or unknown decision", body = crate::error::ErrorBody),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorBody),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn resolve_dispute(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ResolveDisputeRequest>, JsonRejection>,
) -> Result<Json<DisputeBody>, AppError> {
    let req = extract_validated_json(body)?;
    let dispute = state.disputes.resolve_dispute(
        &caller.actor(),
        DisputeId::from_uuid(id),
        &req.decision,
        req.resolution_note,
    )?;
    Ok(Json((&dispute).into()))
}
