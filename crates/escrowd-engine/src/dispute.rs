//! # Dispute Resolution
//!
//! The arbitration engine. A dispute suspends its order's normal
//! progression (order status DISPUTED) until an administrator decides
//! REFUND or RELEASE. The dispute and its order are coupled:
//!
//! | Dispute status      | Order status        |
//! |---------------------|---------------------|
//! | OPEN                | DISPUTED            |
//! | RESOLVED_REFUNDED   | REFUNDED            |
//! | RESOLVED_RELEASED   | RELEASED_TO_SELLER  |
//!
//! The pairs change together inside one [`Ledger::transact`] call or not
//! at all; a dispute row without its order flagged (or the reverse) is a
//! correctness violation, not an acceptable race outcome.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use escrowd_core::{Clock, DisputeId, EscrowError, OrderId, Timestamp, UserId};

use crate::authz::{self, Actor};
use crate::ledger::Ledger;

// ── Dispute Status ─────────────────────────────────────────────────────

/// The lifecycle status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    /// Awaiting an administrator's decision.
    Open,
    /// Resolved in the buyer's favour; the order was refunded. Terminal.
    ResolvedRefunded,
    /// Resolved in the seller's favour; funds were released. Terminal.
    ResolvedReleased,
}

impl DisputeStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::ResolvedRefunded => "RESOLVED_REFUNDED",
            Self::ResolvedReleased => "RESOLVED_RELEASED",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Decision ───────────────────────────────────────────────────────────

/// An administrator's resolution decision.
///
/// Arrives over the wire as an opaque string and is parsed here, so the
/// engine — not the transport — owns the `InvalidDecision` failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Return escrowed funds to the buyer.
    Refund,
    /// Release escrowed funds to the seller.
    Release,
}

impl Decision {
    /// Parse a wire decision string.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidDecision`] for anything other than
    /// `REFUND` or `RELEASE`.
    pub fn parse(s: &str) -> Result<Self, EscrowError> {
        match s {
            "REFUND" => Ok(Self::Refund),
            "RELEASE" => Ok(Self::Release),
            other => Err(EscrowError::InvalidDecision(other.to_string())),
        }
    }

    /// The canonical string name of this decision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refund => "REFUND",
            Self::Release => "RELEASE",
        }
    }
}

// ── Dispute Entity ─────────────────────────────────────────────────────

/// An arbitration case tied to exactly one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    /// Unique dispute identifier.
    pub id: DisputeId,
    /// The disputed order. Immutable.
    pub order_id: OrderId,
    /// The party that opened the dispute. Immutable.
    pub created_by: UserId,
    /// Why the dispute was opened. Non-empty.
    pub reason: String,
    /// Current status.
    pub status: DisputeStatus,
    /// The administrator's note, set exactly once on resolution.
    pub resolution_note: Option<String>,
    /// When the dispute was resolved. Set exactly once.
    pub resolved_at: Option<Timestamp>,
    /// When the dispute was opened.
    pub created_at: Timestamp,
}

impl Dispute {
    /// Open a new dispute.
    pub fn new(order_id: OrderId, created_by: UserId, reason: String, now: Timestamp) -> Self {
        Self {
            id: DisputeId::new(),
            order_id,
            created_by,
            reason,
            status: DisputeStatus::Open,
            resolution_note: None,
            resolved_at: None,
            created_at: now,
        }
    }

    /// Record the administrator's decision.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::AlreadyResolved`] unless the dispute is OPEN.
    pub fn resolve(
        &mut self,
        decision: Decision,
        resolution_note: Option<String>,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        if self.status != DisputeStatus::Open {
            return Err(EscrowError::AlreadyResolved {
                dispute_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        self.status = match decision {
            Decision::Refund => DisputeStatus::ResolvedRefunded,
            Decision::Release => DisputeStatus::ResolvedReleased,
        };
        self.resolution_note = resolution_note;
        self.resolved_at = Some(now);
        Ok(())
    }
}

// ── Dispute Engine ─────────────────────────────────────────────────────

/// The dispute resolution engine.
///
/// Like [`crate::OrderEngine`], a plain value over its dependencies. The
/// cross-entity operations run inside [`Ledger::transact`], so the
/// dispute/order coupling can never be observed half-applied.
#[derive(Clone)]
pub struct DisputeEngine {
    ledger: Ledger,
    clock: Arc<dyn Clock>,
}

impl DisputeEngine {
    /// Create an engine over the given ledger and clock.
    pub fn new(ledger: Ledger, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// Open a dispute on an order.
    ///
    /// Requires the actor to be a party to the order, the order to be in
    /// PAID_ESCROW_LOCKED or DELIVERED_PENDING_CONFIRMATION, and no OPEN
    /// dispute to exist for it. Creates the dispute and flags the order
    /// DISPUTED as one atomic unit.
    pub fn open_dispute(
        &self,
        actor: &Actor,
        order_id: OrderId,
        reason: &str,
    ) -> Result<Dispute, EscrowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EscrowError::InvalidInput(
                "dispute reason must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let actor = *actor;
        let reason = reason.to_string();
        self.ledger.transact(move |txn| {
            let mut order = txn.order(&order_id)?;
            authz::check_open_dispute(&actor, &order)?;
            if let Some(existing) = txn.open_dispute_for(&order_id) {
                return Err(EscrowError::DisputeAlreadyOpen {
                    order_id: order_id.to_string(),
                    dispute_id: existing.id.to_string(),
                });
            }
            order.mark_disputed(now)?;

            let dispute = Dispute::new(order_id, actor.id, reason, now);
            txn.put_order(order);
            txn.put_dispute(dispute.clone());
            Ok(dispute)
        })
    }

    /// Resolve a dispute with REFUND or RELEASE.
    ///
    /// Administrator only. Writes the dispute resolution and the order's
    /// final status in the same transaction; `released_at` is set when the
    /// decision is RELEASE.
    pub fn resolve_dispute(
        &self,
        actor: &Actor,
        dispute_id: DisputeId,
        decision: &str,
        resolution_note: Option<String>,
    ) -> Result<Dispute, EscrowError> {
        authz::check_resolve_dispute(actor)?;
        let decision = Decision::parse(decision)?;

        let now = self.clock.now();
        self.ledger.transact(move |txn| {
            let mut dispute = txn.dispute(&dispute_id)?;
            let mut order = txn.order(&dispute.order_id)?;

            dispute.resolve(decision, resolution_note, now)?;
            match decision {
                Decision::Refund => order.refund_via_dispute(now)?,
                Decision::Release => order.release_via_dispute(now)?,
            }

            txn.put_order(order);
            txn.put_dispute(dispute.clone());
            Ok(dispute)
        })
    }

    /// Fetch one dispute, visible to the parties of its order and to
    /// administrators.
    pub fn get_dispute(&self, actor: &Actor, dispute_id: DisputeId) -> Result<Dispute, EscrowError> {
        let dispute = self
            .ledger
            .get_dispute(&dispute_id)
            .ok_or_else(|| EscrowError::dispute_not_found(dispute_id))?;
        let order = self
            .ledger
            .get_order(&dispute.order_id)
            .ok_or_else(|| EscrowError::order_not_found(dispute.order_id))?;
        authz::check_view_dispute(actor, &order)?;
        Ok(dispute)
    }

    /// List disputes visible to the actor: everything for an
    /// administrator, otherwise disputes on orders the actor is a party
    /// to. Newest first.
    pub fn list_disputes(&self, actor: &Actor) -> Vec<Dispute> {
        let mut disputes: Vec<Dispute> = self
            .ledger
            .disputes_where(|_| true)
            .into_iter()
            .filter(|d| {
                if actor.role.is_admin() {
                    return true;
                }
                match self.ledger.get_order(&d.order_id) {
                    Some(order) => order.buyer_id == actor.id || order.seller_id == actor.id,
                    None => false,
                }
            })
            .collect();
        disputes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        disputes
    }
}
