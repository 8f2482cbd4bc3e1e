//! # Escrow Order Lifecycle
//!
//! The order state machine: payment lock, delivery confirmation, release,
//! and cancellation. Status progression is a directed acyclic graph; any
//! transition outside it is rejected with `InvalidState` and leaves the
//! order untouched — the machine never silently clamps or reorders.
//!
//! ## Transition Graph
//!
//! ```text
//! CREATED ──pay──▶ PAID_ESCROW_LOCKED ──confirm──▶ DELIVERED_PENDING_CONFIRMATION
//!    │                    │                                 │
//!    │ cancel             │ dispute                         ├─release──▶ RELEASED_TO_SELLER
//!    ▼                    ▼                                 │
//! CANCELLED            DISPUTED ◀──────────dispute──────────┘
//!                         │
//!                         ├─resolve(REFUND)───▶ REFUNDED
//!                         └─resolve(RELEASE)──▶ RELEASED_TO_SELLER
//! ```
//!
//! Disputed orders leave DISPUTED only through the dispute engine. An
//! administrator may additionally release a locked order before delivery
//! confirmation (support override, bypassing the delivery-proof code).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use escrowd_core::{Amount, Clock, EscrowError, OrderId, Timestamp, UserId};
use escrowd_crypto::{OtpCode, OtpHash, OtpIssuer};

use crate::authz::{self, Actor, OrderAction};
use crate::ledger::Ledger;

// ── Order Status ───────────────────────────────────────────────────────

/// The lifecycle status of an escrowed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order created; no funds locked yet.
    Created,
    /// Buyer's payment is recorded and held in escrow.
    PaidEscrowLocked,
    /// Buyer has proven delivery with the one-time code.
    DeliveredPendingConfirmation,
    /// Funds released to the seller. Terminal state.
    ReleasedToSeller,
    /// An open dispute has suspended normal progression.
    Disputed,
    /// Escrowed funds returned to the buyer by arbitration. Terminal state.
    Refunded,
    /// Cancelled before funds were locked. Terminal state.
    Cancelled,
}

impl OrderStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::PaidEscrowLocked => "PAID_ESCROW_LOCKED",
            Self::DeliveredPendingConfirmation => "DELIVERED_PENDING_CONFIRMATION",
            Self::ReleasedToSeller => "RELEASED_TO_SELLER",
            Self::Disputed => "DISPUTED",
            Self::Refunded => "REFUNDED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ReleasedToSeller | Self::Refunded | Self::Cancelled)
    }

    /// Valid target statuses from this status, per the documented graph.
    /// The admin pre-delivery release override is not part of the graph.
    pub fn valid_transitions(&self) -> &'static [OrderStatus] {
        match self {
            Self::Created => &[Self::PaidEscrowLocked, Self::Cancelled],
            Self::PaidEscrowLocked => &[Self::DeliveredPendingConfirmation, Self::Disputed],
            Self::DeliveredPendingConfirmation => &[Self::ReleasedToSeller, Self::Disputed],
            Self::Disputed => &[Self::Refunded, Self::ReleasedToSeller],
            Self::ReleasedToSeller | Self::Refunded | Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Order Entity ───────────────────────────────────────────────────────

/// One escrowed trade between a buyer and a seller.
///
/// Mutated only through the transition methods below, each of which
/// validates the current status before touching any field. Audit fields
/// (`paid_at`, `released_at`) are set exactly once, on the corresponding
/// transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// The paying party. Immutable after creation.
    pub buyer_id: UserId,
    /// The receiving party. Immutable after creation.
    pub seller_id: UserId,
    /// The escrowed amount.
    pub amount: Amount,
    /// Optional description of the traded item.
    pub item_name: Option<String>,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// One-way hash of the delivery-proof code. Set once at creation,
    /// never re-issued, never exposed through the API.
    pub otp_hash: OtpHash,
    /// Opaque payment rail label, recorded for audit when payment locks.
    pub payment_method: Option<String>,
    /// Opaque payment reference, recorded for audit when payment locks.
    pub payment_ref: Option<String>,
    /// When payment locked. Set iff the order has passed PAID_ESCROW_LOCKED.
    pub paid_at: Option<Timestamp>,
    /// When funds released. Set iff the order reached RELEASED_TO_SELLER.
    pub released_at: Option<Timestamp>,
    /// When the order was created.
    pub created_at: Timestamp,
    /// When the order last changed.
    pub updated_at: Timestamp,
}

impl Order {
    /// Create a new order in CREATED status.
    pub fn new(
        buyer_id: UserId,
        seller_id: UserId,
        amount: Amount,
        item_name: Option<String>,
        otp_hash: OtpHash,
        now: Timestamp,
    ) -> Self {
        Self {
            id: OrderId::new(),
            buyer_id,
            seller_id,
            amount,
            item_name,
            status: OrderStatus::Created,
            otp_hash,
            payment_method: None,
            payment_ref: None,
            paid_at: None,
            released_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn invalid_state(&self, operation: &'static str) -> EscrowError {
        EscrowError::InvalidState {
            operation,
            status: self.status.to_string(),
        }
    }

    /// Lock the buyer's payment into escrow.
    ///
    /// Transitions CREATED → PAID_ESCROW_LOCKED and records the payment
    /// audit fields and `paid_at`.
    pub fn record_payment(
        &mut self,
        payment_method: String,
        payment_ref: Option<String>,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        if self.status != OrderStatus::Created {
            return Err(self.invalid_state("record payment"));
        }
        self.status = OrderStatus::PaidEscrowLocked;
        self.payment_method = Some(payment_method);
        self.payment_ref = payment_ref;
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Prove delivery with the one-time code.
    ///
    /// Transitions PAID_ESCROW_LOCKED → DELIVERED_PENDING_CONFIRMATION when
    /// the presented code matches the stored hash. On mismatch the order is
    /// left unchanged and the call fails `InvalidOtp`.
    pub fn confirm_delivery(&mut self, presented: &OtpCode, now: Timestamp) -> Result<(), EscrowError> {
        if self.status != OrderStatus::PaidEscrowLocked {
            return Err(self.invalid_state("confirm delivery"));
        }
        if !self.otp_hash.verify(presented) {
            return Err(EscrowError::InvalidOtp);
        }
        self.status = OrderStatus::DeliveredPendingConfirmation;
        self.updated_at = now;
        Ok(())
    }

    /// Release escrowed funds to the seller.
    ///
    /// Valid while funds are locked: PAID_ESCROW_LOCKED (admin override
    /// only — the engine restricts buyers to the confirmed-delivery edge)
    /// or DELIVERED_PENDING_CONFIRMATION. Sets `released_at`. A disputed
    /// order is released only through dispute resolution.
    pub fn release(&mut self, now: Timestamp) -> Result<(), EscrowError> {
        if !matches!(
            self.status,
            OrderStatus::PaidEscrowLocked | OrderStatus::DeliveredPendingConfirmation
        ) {
            return Err(self.invalid_state("release funds"));
        }
        self.status = OrderStatus::ReleasedToSeller;
        self.released_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Cancel the order. Valid only while CREATED, before funds lock.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), EscrowError> {
        if self.status != OrderStatus::Created {
            return Err(self.invalid_state("cancel"));
        }
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Suspend normal progression under an open dispute.
    ///
    /// Transitions PAID_ESCROW_LOCKED or DELIVERED_PENDING_CONFIRMATION
    /// → DISPUTED. Called by the dispute engine inside the same
    /// transaction that creates the dispute.
    pub fn mark_disputed(&mut self, now: Timestamp) -> Result<(), EscrowError> {
        if !matches!(
            self.status,
            OrderStatus::PaidEscrowLocked | OrderStatus::DeliveredPendingConfirmation
        ) {
            return Err(self.invalid_state("open a dispute"));
        }
        self.status = OrderStatus::Disputed;
        self.updated_at = now;
        Ok(())
    }

    /// Return escrowed funds to the buyer by arbitration. DISPUTED only.
    pub fn refund_via_dispute(&mut self, now: Timestamp) -> Result<(), EscrowError> {
        if self.status != OrderStatus::Disputed {
            return Err(self.invalid_state("refund"));
        }
        self.status = OrderStatus::Refunded;
        self.updated_at = now;
        Ok(())
    }

    /// Release escrowed funds to the seller by arbitration. DISPUTED only.
    pub fn release_via_dispute(&mut self, now: Timestamp) -> Result<(), EscrowError> {
        if self.status != OrderStatus::Disputed {
            return Err(self.invalid_state("release funds"));
        }
        self.status = OrderStatus::ReleasedToSeller;
        self.released_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

// ── Order Engine ───────────────────────────────────────────────────────

/// Parameters for opening a new escrow order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The selling party. Must resolve to an active user with SELLER role.
    pub seller_id: UserId,
    /// The amount to escrow, as a decimal string.
    pub amount: String,
    /// Optional item description.
    pub item_name: Option<String>,
    /// Caller-supplied delivery-proof code. When absent the engine
    /// generates one.
    pub otp: Option<String>,
}

/// The result of order creation.
#[derive(Debug)]
pub struct CreatedOrder {
    /// The stored order.
    pub order: Order,
    /// The plaintext delivery-proof code, present only when it was
    /// server-generated. A caller-supplied code is never echoed back.
    pub otp: Option<OtpCode>,
}

/// The order lifecycle engine.
///
/// A plain value holding its dependencies: the ledger it persists through,
/// the code issuer, and the clock. Construct once and share; all methods
/// take `&self`.
#[derive(Clone)]
pub struct OrderEngine {
    ledger: Ledger,
    issuer: OtpIssuer,
    clock: Arc<dyn Clock>,
}

impl OrderEngine {
    /// Create an engine over the given ledger, issuer, and clock.
    pub fn new(ledger: Ledger, issuer: OtpIssuer, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            issuer,
            clock,
        }
    }

    /// Open a new escrow order for `actor` (the buyer).
    ///
    /// Validates that the amount is a positive decimal and that the seller
    /// resolves to an active SELLER. Stores only the hash of the
    /// delivery-proof code; the plaintext is returned iff it was generated
    /// here.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-buyers, `InvalidInput` for a bad amount,
    /// unresolved seller, or malformed caller-supplied code.
    pub fn create_order(&self, actor: &Actor, new: NewOrder) -> Result<CreatedOrder, EscrowError> {
        authz::check_create_order(actor)?;

        let amount = Amount::new(new.amount)?;
        let seller = self
            .ledger
            .get_user(&new.seller_id)
            .filter(|u| u.can_sell())
            .ok_or_else(|| {
                EscrowError::InvalidInput(format!(
                    "sellerId {} does not resolve to an active seller",
                    new.seller_id
                ))
            })?;

        let (generated, otp_hash) = match new.otp {
            Some(code) => (None, OtpHash::from_code(&OtpCode::new(code)?)),
            None => {
                let (code, hash) = self.issuer.issue();
                (Some(code), hash)
            }
        };

        let order = Order::new(
            actor.id,
            seller.id,
            amount,
            new.item_name,
            otp_hash,
            self.clock.now(),
        );
        self.ledger.insert_order(order.clone());

        Ok(CreatedOrder {
            order,
            otp: generated,
        })
    }

    /// Fetch one order, visible to its parties and administrators.
    pub fn get_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order, EscrowError> {
        let order = self
            .ledger
            .get_order(&order_id)
            .ok_or_else(|| EscrowError::order_not_found(order_id))?;
        authz::check_order(actor, OrderAction::View, &order)?;
        Ok(order)
    }

    /// List orders visible to the actor: everything for an administrator,
    /// otherwise the orders the actor is a party to. Newest first.
    pub fn list_orders(&self, actor: &Actor) -> Vec<Order> {
        let mut orders = if actor.role.is_admin() {
            self.ledger.orders_where(|_| true)
        } else {
            let id = actor.id;
            self.ledger
                .orders_where(move |o| o.buyer_id == id || o.seller_id == id)
        };
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Record the buyer's payment, locking funds into escrow.
    pub fn mark_as_paid(
        &self,
        actor: &Actor,
        order_id: OrderId,
        payment_method: &str,
        payment_ref: Option<String>,
    ) -> Result<Order, EscrowError> {
        let payment_method = payment_method.trim();
        if payment_method.is_empty() {
            return Err(EscrowError::InvalidInput(
                "payment method must not be empty".to_string(),
            ));
        }

        let snapshot = self
            .ledger
            .get_order(&order_id)
            .ok_or_else(|| EscrowError::order_not_found(order_id))?;
        authz::check_order(actor, OrderAction::Pay, &snapshot)?;
        if snapshot.status != OrderStatus::Created {
            return Err(EscrowError::InvalidState {
                operation: "record payment",
                status: snapshot.status.to_string(),
            });
        }

        let now = self.clock.now();
        let method = payment_method.to_string();
        self.ledger
            .update_order_guarded(&order_id, OrderStatus::Created, move |order| {
                order.record_payment(method, payment_ref, now)
            })
    }

    /// Prove delivery with the one-time code.
    ///
    /// On mismatch the order is unchanged and the call fails `InvalidOtp`;
    /// a malformed code is likewise reported as `InvalidOtp` so the error
    /// reveals nothing about the expected format beyond the documented one.
    pub fn confirm_delivery(
        &self,
        actor: &Actor,
        order_id: OrderId,
        presented: &str,
    ) -> Result<Order, EscrowError> {
        let presented = OtpCode::new(presented).map_err(|_| EscrowError::InvalidOtp)?;

        let snapshot = self
            .ledger
            .get_order(&order_id)
            .ok_or_else(|| EscrowError::order_not_found(order_id))?;
        authz::check_order(actor, OrderAction::ConfirmDelivery, &snapshot)?;
        if snapshot.status != OrderStatus::PaidEscrowLocked {
            return Err(EscrowError::InvalidState {
                operation: "confirm delivery",
                status: snapshot.status.to_string(),
            });
        }

        let now = self.clock.now();
        self.ledger
            .update_order_guarded(&order_id, OrderStatus::PaidEscrowLocked, move |order| {
                order.confirm_delivery(&presented, now)
            })
    }

    /// Release escrowed funds to the seller.
    ///
    /// The buyer may release once delivery is confirmed. An administrator
    /// may release any order whose funds are locked but not yet disputed —
    /// the support override that bypasses the delivery-proof code. Disputed
    /// orders are released only through dispute resolution.
    pub fn release_funds(&self, actor: &Actor, order_id: OrderId) -> Result<Order, EscrowError> {
        let snapshot = self
            .ledger
            .get_order(&order_id)
            .ok_or_else(|| EscrowError::order_not_found(order_id))?;
        authz::check_order(actor, OrderAction::Release, &snapshot)?;

        let allowed: &[OrderStatus] = if actor.role.is_admin() {
            &[
                OrderStatus::PaidEscrowLocked,
                OrderStatus::DeliveredPendingConfirmation,
            ]
        } else {
            &[OrderStatus::DeliveredPendingConfirmation]
        };
        if !allowed.contains(&snapshot.status) {
            return Err(EscrowError::InvalidState {
                operation: "release funds",
                status: snapshot.status.to_string(),
            });
        }

        let now = self.clock.now();
        self.ledger
            .update_order_guarded(&order_id, snapshot.status, move |order| order.release(now))
    }

    /// Cancel the order before funds lock. Permitted for either party or
    /// an administrator, only while CREATED.
    pub fn cancel_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order, EscrowError> {
        let snapshot = self
            .ledger
            .get_order(&order_id)
            .ok_or_else(|| EscrowError::order_not_found(order_id))?;
        authz::check_order(actor, OrderAction::Cancel, &snapshot)?;
        if snapshot.status != OrderStatus::Created {
            return Err(EscrowError::InvalidState {
                operation: "cancel",
                status: snapshot.status.to_string(),
            });
        }

        let now = self.clock.now();
        self.ledger
            .update_order_guarded(&order_id, OrderStatus::Created, move |order| order.cancel(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use escrowd_core::{FixedClock, Role};
    use escrowd_crypto::PasswordHash;

    use crate::user::User;

    fn fixed_now() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap())
    }

    fn test_hash() -> OtpHash {
        OtpHash::from_code(&OtpCode::new("482913").unwrap())
    }

    fn order_in(status: OrderStatus) -> Order {
        let mut order = Order::new(
            UserId::new(),
            UserId::new(),
            Amount::new("100.00").unwrap(),
            None,
            test_hash(),
            fixed_now(),
        );
        // Drive the entity along a consistent path to the target status so
        // the timestamp invariants hold for every starting point.
        match status {
            OrderStatus::Created => {}
            OrderStatus::PaidEscrowLocked => {
                order
                    .record_payment("Bank Transfer".into(), None, fixed_now())
                    .unwrap();
            }
            OrderStatus::DeliveredPendingConfirmation => {
                order
                    .record_payment("Bank Transfer".into(), None, fixed_now())
                    .unwrap();
                order
                    .confirm_delivery(&OtpCode::new("482913").unwrap(), fixed_now())
                    .unwrap();
            }
            OrderStatus::ReleasedToSeller => {
                order
                    .record_payment("Bank Transfer".into(), None, fixed_now())
                    .unwrap();
                order
                    .confirm_delivery(&OtpCode::new("482913").unwrap(), fixed_now())
                    .unwrap();
                order.release(fixed_now()).unwrap();
            }
            OrderStatus::Disputed => {
                order
                    .record_payment("Bank Transfer".into(), None, fixed_now())
                    .unwrap();
                order.mark_disputed(fixed_now()).unwrap();
            }
            OrderStatus::Refunded => {
                order
                    .record_payment("Bank Transfer".into(), None, fixed_now())
                    .unwrap();
                order.mark_disputed(fixed_now()).unwrap();
                order.refund_via_dispute(fixed_now()).unwrap();
            }
            OrderStatus::Cancelled => {
                order.cancel(fixed_now()).unwrap();
            }
        }
        order
    }

    const ALL_STATUSES: [OrderStatus; 7] = [
        OrderStatus::Created,
        OrderStatus::PaidEscrowLocked,
        OrderStatus::DeliveredPendingConfirmation,
        OrderStatus::ReleasedToSeller,
        OrderStatus::Disputed,
        OrderStatus::Refunded,
        OrderStatus::Cancelled,
    ];

    // ── Entity transition closure ────────────────────────────────────

    #[test]
    fn transition_matrix_is_closed() {
        // Each entity operation must succeed exactly from its documented
        // source statuses and leave the order untouched everywhere else.
        type Op = (&'static str, fn(&mut Order) -> Result<(), EscrowError>, &'static [OrderStatus]);
        let ops: [Op; 7] = [
            (
                "record_payment",
                |o| o.record_payment("m".into(), None, fixed_now()),
                &[OrderStatus::Created],
            ),
            (
                "confirm_delivery",
                |o| o.confirm_delivery(&OtpCode::new("482913").unwrap(), fixed_now()),
                &[OrderStatus::PaidEscrowLocked],
            ),
            (
                "release",
                |o| o.release(fixed_now()),
                &[
                    OrderStatus::PaidEscrowLocked,
                    OrderStatus::DeliveredPendingConfirmation,
                ],
            ),
            ("cancel", |o| o.cancel(fixed_now()), &[OrderStatus::Created]),
            (
                "mark_disputed",
                |o| o.mark_disputed(fixed_now()),
                &[
                    OrderStatus::PaidEscrowLocked,
                    OrderStatus::DeliveredPendingConfirmation,
                ],
            ),
            (
                "refund_via_dispute",
                |o| o.refund_via_dispute(fixed_now()),
                &[OrderStatus::Disputed],
            ),
            (
                "release_via_dispute",
                |o| o.release_via_dispute(fixed_now()),
                &[OrderStatus::Disputed],
            ),
        ];

        for status in ALL_STATUSES {
            for (name, op, allowed_from) in &ops {
                let mut order = order_in(status);
                let before = order.clone();
                let result = op(&mut order);
                if allowed_from.contains(&status) {
                    assert!(result.is_ok(), "{name} should succeed from {status}");
                } else {
                    assert!(
                        matches!(result, Err(EscrowError::InvalidState { .. })),
                        "{name} from {status} must fail InvalidState"
                    );
                    assert_eq!(
                        serde_json::to_value(&order).unwrap(),
                        serde_json::to_value(&before).unwrap(),
                        "{name} from {status} must leave the order unchanged"
                    );
                }
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_transitions() {
        for status in ALL_STATUSES {
            assert_eq!(
                status.is_terminal(),
                status.valid_transitions().is_empty(),
                "{status}"
            );
        }
    }

    #[test]
    fn otp_mismatch_leaves_order_unchanged() {
        let mut order = order_in(OrderStatus::PaidEscrowLocked);
        let before = order.clone();
        let result = order.confirm_delivery(&OtpCode::new("000000").unwrap(), fixed_now());
        assert_eq!(result, Err(EscrowError::InvalidOtp));
        assert_eq!(order.status, OrderStatus::PaidEscrowLocked);
        assert_eq!(
            serde_json::to_value(&order).unwrap(),
            serde_json::to_value(&before).unwrap()
        );
    }

    #[test]
    fn timestamps_track_the_transitions() {
        let order = order_in(OrderStatus::ReleasedToSeller);
        assert_eq!(order.paid_at, Some(fixed_now()));
        assert_eq!(order.released_at, Some(fixed_now()));

        let order = order_in(OrderStatus::Created);
        assert_eq!(order.paid_at, None);
        assert_eq!(order.released_at, None);

        let order = order_in(OrderStatus::Refunded);
        assert_eq!(order.paid_at, Some(fixed_now()));
        assert_eq!(order.released_at, None);
    }

    // ── Engine tests ─────────────────────────────────────────────────

    struct Fixture {
        engine: OrderEngine,
        ledger: Ledger,
        buyer: Actor,
        seller: Actor,
        admin: Actor,
    }

    fn register(ledger: &Ledger, role: Role, phone: &str) -> Actor {
        let user = User::new(
            format!("{role} user"),
            phone.to_string(),
            None,
            PasswordHash::new("pw"),
            role,
            fixed_now(),
        );
        let actor = Actor::new(user.id, role);
        ledger.insert_user(user).unwrap();
        actor
    }

    fn fixture() -> Fixture {
        let ledger = Ledger::new();
        let buyer = register(&ledger, Role::Buyer, "+920000000001");
        let seller = register(&ledger, Role::Seller, "+920000000002");
        let admin = register(&ledger, Role::Admin, "+920000000003");
        let engine = OrderEngine::new(
            ledger.clone(),
            OtpIssuer::new(),
            Arc::new(FixedClock(fixed_now())),
        );
        Fixture {
            engine,
            ledger,
            buyer,
            seller,
            admin,
        }
    }

    fn new_order(fx: &Fixture, otp: Option<&str>) -> CreatedOrder {
        fx.engine
            .create_order(
                &fx.buyer,
                NewOrder {
                    seller_id: fx.seller.id,
                    amount: "100.00".to_string(),
                    item_name: Some("mechanical keyboard".to_string()),
                    otp: otp.map(str::to_string),
                },
            )
            .unwrap()
    }

    #[test]
    fn full_escrow_scenario() {
        let fx = fixture();

        // Create with no code supplied: the response carries the plaintext.
        let created = new_order(&fx, None);
        assert_eq!(created.order.status, OrderStatus::Created);
        let code = created.otp.expect("server-generated code must be returned");
        let id = created.order.id;

        // Pay.
        let paid = fx
            .engine
            .mark_as_paid(&fx.buyer, id, "Bank Transfer", Some("TXN-1".to_string()))
            .unwrap();
        assert_eq!(paid.status, OrderStatus::PaidEscrowLocked);
        assert_eq!(paid.payment_method.as_deref(), Some("Bank Transfer"));
        assert!(paid.paid_at.is_some());

        // Wrong code: InvalidOtp, status unchanged.
        let wrong = fx.engine.confirm_delivery(&fx.buyer, id, "000000");
        assert_eq!(wrong.unwrap_err(), EscrowError::InvalidOtp);
        assert_eq!(
            fx.engine.get_order(&fx.buyer, id).unwrap().status,
            OrderStatus::PaidEscrowLocked
        );

        // Right code.
        let delivered = fx
            .engine
            .confirm_delivery(&fx.buyer, id, code.reveal())
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::DeliveredPendingConfirmation);

        // Release.
        let released = fx.engine.release_funds(&fx.buyer, id).unwrap();
        assert_eq!(released.status, OrderStatus::ReleasedToSeller);
        assert_eq!(released.released_at, Some(fixed_now()));

        // A second release fails InvalidState.
        let again = fx.engine.release_funds(&fx.buyer, id);
        assert!(matches!(again, Err(EscrowError::InvalidState { .. })));
    }

    #[test]
    fn caller_supplied_code_is_never_echoed() {
        let fx = fixture();
        let created = new_order(&fx, Some("135790"));
        assert!(created.otp.is_none());

        // But it verifies.
        let id = created.order.id;
        fx.engine
            .mark_as_paid(&fx.buyer, id, "cash", None)
            .unwrap();
        let confirmed = fx.engine.confirm_delivery(&fx.buyer, id, "135790").unwrap();
        assert_eq!(confirmed.status, OrderStatus::DeliveredPendingConfirmation);
    }

    #[test]
    fn confirmation_succeeds_exactly_once() {
        let fx = fixture();
        let created = new_order(&fx, Some("135790"));
        let id = created.order.id;
        fx.engine
            .mark_as_paid(&fx.buyer, id, "cash", None)
            .unwrap();
        fx.engine.confirm_delivery(&fx.buyer, id, "135790").unwrap();
        let second = fx.engine.confirm_delivery(&fx.buyer, id, "135790");
        assert!(matches!(second, Err(EscrowError::InvalidState { .. })));
    }

    #[test]
    fn create_order_validations() {
        let fx = fixture();

        // Non-positive amount.
        let err = fx
            .engine
            .create_order(
                &fx.buyer,
                NewOrder {
                    seller_id: fx.seller.id,
                    amount: "0".to_string(),
                    item_name: None,
                    otp: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput(_)));

        // Unknown seller.
        let err = fx
            .engine
            .create_order(
                &fx.buyer,
                NewOrder {
                    seller_id: UserId::new(),
                    amount: "10".to_string(),
                    item_name: None,
                    otp: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput(_)));

        // A buyer is not seller-capable.
        let other_buyer = register(&fx.ledger, Role::Buyer, "+920000000009");
        let err = fx
            .engine
            .create_order(
                &fx.buyer,
                NewOrder {
                    seller_id: other_buyer.id,
                    amount: "10".to_string(),
                    item_name: None,
                    otp: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput(_)));

        // Malformed caller-supplied code.
        let err = fx
            .engine
            .create_order(
                &fx.buyer,
                NewOrder {
                    seller_id: fx.seller.id,
                    amount: "10".to_string(),
                    item_name: None,
                    otp: Some("12ab".to_string()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput(_)));

        // Sellers cannot create orders at all.
        let err = fx
            .engine
            .create_order(
                &fx.seller,
                NewOrder {
                    seller_id: fx.seller.id,
                    amount: "10".to_string(),
                    item_name: None,
                    otp: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized(_)));
    }

    #[test]
    fn seller_cannot_drive_the_buyer_side() {
        let fx = fixture();
        let created = new_order(&fx, Some("135790"));
        let id = created.order.id;

        let err = fx
            .engine
            .mark_as_paid(&fx.seller, id, "cash", None)
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized(_)));

        fx.engine
            .mark_as_paid(&fx.buyer, id, "cash", None)
            .unwrap();
        let err = fx
            .engine
            .confirm_delivery(&fx.seller, id, "135790")
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized(_)));

        let err = fx.engine.release_funds(&fx.seller, id).unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized(_)));
    }

    #[test]
    fn strangers_cannot_view_orders() {
        let fx = fixture();
        let created = new_order(&fx, None);
        let stranger = register(&fx.ledger, Role::Buyer, "+920000000010");

        let err = fx.engine.get_order(&stranger, created.order.id).unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized(_)));
    }

    #[test]
    fn listing_filters_by_party() {
        let fx = fixture();
        let created = new_order(&fx, None);
        let stranger = register(&fx.ledger, Role::Buyer, "+920000000010");

        assert_eq!(fx.engine.list_orders(&fx.buyer).len(), 1);
        assert_eq!(fx.engine.list_orders(&fx.seller).len(), 1);
        assert_eq!(fx.engine.list_orders(&fx.admin).len(), 1);
        assert!(fx.engine.list_orders(&stranger).is_empty());
        assert_eq!(fx.engine.list_orders(&fx.buyer)[0].id, created.order.id);
    }

    #[test]
    fn cancellation_window_closes_at_payment() {
        let fx = fixture();

        // While CREATED any party or an admin may cancel.
        for actor in [fx.buyer, fx.seller, fx.admin] {
            let created = new_order(&fx, None);
            let cancelled = fx.engine.cancel_order(&actor, created.order.id).unwrap();
            assert_eq!(cancelled.status, OrderStatus::Cancelled);
        }

        // Once paid, nobody can.
        let created = new_order(&fx, None);
        let id = created.order.id;
        fx.engine
            .mark_as_paid(&fx.buyer, id, "cash", None)
            .unwrap();
        for actor in [fx.buyer, fx.seller, fx.admin] {
            let err = fx.engine.cancel_order(&actor, id).unwrap_err();
            assert!(matches!(err, EscrowError::InvalidState { .. }));
        }
    }

    #[test]
    fn admin_release_overrides_delivery_proof() {
        let fx = fixture();
        let created = new_order(&fx, None);
        let id = created.order.id;
        fx.engine
            .mark_as_paid(&fx.buyer, id, "cash", None)
            .unwrap();

        // Buyer cannot release before confirming delivery.
        let err = fx.engine.release_funds(&fx.buyer, id).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidState { .. }));

        // Admin can, straight from escrow lock.
        let released = fx.engine.release_funds(&fx.admin, id).unwrap();
        assert_eq!(released.status, OrderStatus::ReleasedToSeller);
        assert!(released.released_at.is_some());
    }

    #[test]
    fn admin_release_needs_locked_funds() {
        let fx = fixture();
        let created = new_order(&fx, None);

        // Nothing in escrow yet.
        let err = fx.engine.release_funds(&fx.admin, created.order.id).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidState { .. }));
    }

    #[test]
    fn unknown_order_is_not_found() {
        let fx = fixture();
        let err = fx.engine.get_order(&fx.buyer, OrderId::new()).unwrap_err();
        assert!(matches!(err, EscrowError::NotFound { kind: "order", .. }));
    }

    #[test]
    fn empty_payment_method_is_rejected() {
        let fx = fixture();
        let created = new_order(&fx, None);
        let err = fx
            .engine
            .mark_as_paid(&fx.buyer, created.order.id, "   ", None)
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput(_)));
    }
}
