//! # Ledger — The Persistence Gateway
//!
//! Thread-safe, cloneable in-process store for users, orders, and disputes.
//! This is the only mutable state the engines share; everything else is a
//! value per request.
//!
//! All operations are synchronous (`parking_lot::RwLock`, never held across
//! an `.await`), and the lock is non-poisonable — a panicking writer does
//! not permanently corrupt the store.
//!
//! ## Write Contract
//!
//! - [`Ledger::update_order_guarded`] is the optimistic-concurrency
//!   primitive: the caller states the order status it observed, the update
//!   re-checks it under the write lock, and a mismatch fails `Conflict`
//!   without touching the record. Two racing writers cannot both commit.
//! - [`Ledger::transact`] is the multi-entity primitive: the closure works
//!   against a staged view, and the stage is applied only when it returns
//!   `Ok`. An `Err` discards every staged write, so no partial cross-entity
//!   state is ever observable.
//!
//! Records are never deleted; the escrow history is a permanent audit
//! trail.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use escrowd_core::{DisputeId, EscrowError, OrderId, UserId};

use crate::dispute::{Dispute, DisputeStatus};
use crate::order::{Order, OrderStatus};
use crate::user::User;

#[derive(Default)]
struct LedgerInner {
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
    disputes: HashMap<DisputeId, Dispute>,
}

/// The shared store. Cheap to clone; clones see the same data.
#[derive(Clone, Default)]
pub struct Ledger {
    inner: Arc<RwLock<LedgerInner>>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Users ──────────────────────────────────────────────────────────

    /// Insert a new user, enforcing phone and email uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidInput`] when the phone number, or the
    /// email if present, is already registered.
    pub fn insert_user(&self, user: User) -> Result<(), EscrowError> {
        let mut inner = self.inner.write();
        if inner.users.values().any(|u| u.phone == user.phone) {
            return Err(EscrowError::InvalidInput(
                "phone number already registered".to_string(),
            ));
        }
        if let Some(email) = &user.email {
            if inner
                .users
                .values()
                .any(|u| u.email.as_deref() == Some(email.as_str()))
            {
                return Err(EscrowError::InvalidInput(
                    "email already registered".to_string(),
                ));
            }
        }
        inner.users.insert(user.id, user);
        Ok(())
    }

    /// Retrieve a user by id.
    pub fn get_user(&self, id: &UserId) -> Option<User> {
        self.inner.read().users.get(id).cloned()
    }

    /// Find a user whose phone or email equals `identifier`.
    pub fn find_user_by_identifier(&self, identifier: &str) -> Option<User> {
        self.inner
            .read()
            .users
            .values()
            .find(|u| u.phone == identifier || u.email.as_deref() == Some(identifier))
            .cloned()
    }

    /// List all users.
    pub fn list_users(&self) -> Vec<User> {
        self.inner.read().users.values().cloned().collect()
    }

    /// Update a user in place. Returns the updated record, or `None` if
    /// the id does not resolve.
    pub fn update_user(&self, id: &UserId, f: impl FnOnce(&mut User)) -> Option<User> {
        let mut inner = self.inner.write();
        let user = inner.users.get_mut(id)?;
        f(user);
        Some(user.clone())
    }

    // ── Orders ─────────────────────────────────────────────────────────

    /// Insert a new order.
    pub fn insert_order(&self, order: Order) {
        self.inner.write().orders.insert(order.id, order);
    }

    /// Retrieve an order by id.
    pub fn get_order(&self, id: &OrderId) -> Option<Order> {
        self.inner.read().orders.get(id).cloned()
    }

    /// List orders matching a predicate.
    pub fn orders_where(&self, f: impl Fn(&Order) -> bool) -> Vec<Order> {
        self.inner
            .read()
            .orders
            .values()
            .filter(|o| f(o))
            .cloned()
            .collect()
    }

    /// Atomically update an order, guarded by the status the caller
    /// observed before deciding to write.
    ///
    /// The closure runs against a draft; the draft replaces the stored
    /// record only when the closure returns `Ok`, so a failed transition
    /// leaves the order byte-for-byte unchanged.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id does not resolve, [`EscrowError::Conflict`] if
    /// the stored status no longer matches `expected` (a concurrent writer
    /// won the race), or whatever the closure itself returns.
    pub fn update_order_guarded(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        f: impl FnOnce(&mut Order) -> Result<(), EscrowError>,
    ) -> Result<Order, EscrowError> {
        let mut inner = self.inner.write();
        let entry = inner
            .orders
            .get_mut(id)
            .ok_or_else(|| EscrowError::order_not_found(id))?;
        if entry.status != expected {
            return Err(EscrowError::Conflict {
                kind: "order",
                id: id.to_string(),
                expected: expected.to_string(),
            });
        }
        let mut draft = entry.clone();
        f(&mut draft)?;
        *entry = draft.clone();
        Ok(draft)
    }

    // ── Disputes ───────────────────────────────────────────────────────

    /// Retrieve a dispute by id.
    pub fn get_dispute(&self, id: &DisputeId) -> Option<Dispute> {
        self.inner.read().disputes.get(id).cloned()
    }

    /// List disputes matching a predicate.
    pub fn disputes_where(&self, f: impl Fn(&Dispute) -> bool) -> Vec<Dispute> {
        self.inner
            .read()
            .disputes
            .values()
            .filter(|d| f(d))
            .cloned()
            .collect()
    }

    /// The OPEN dispute on an order, if any. At most one exists at a time.
    pub fn open_dispute_for(&self, order_id: &OrderId) -> Option<Dispute> {
        self.inner
            .read()
            .disputes
            .values()
            .find(|d| d.order_id == *order_id && d.status == DisputeStatus::Open)
            .cloned()
    }

    // ── Transactions ───────────────────────────────────────────────────

    /// Run a multi-entity transaction.
    ///
    /// The closure reads and stages writes through [`LedgerTxn`]; staged
    /// writes are applied only when it returns `Ok` and discarded entirely
    /// on `Err`. The whole transaction holds the single write lock, so no
    /// other caller can observe an intermediate state.
    pub fn transact<R>(
        &self,
        f: impl FnOnce(&mut LedgerTxn<'_>) -> Result<R, EscrowError>,
    ) -> Result<R, EscrowError> {
        let mut inner = self.inner.write();
        let mut txn = LedgerTxn {
            base: &mut *inner,
            staged_orders: HashMap::new(),
            staged_disputes: HashMap::new(),
        };
        let result = f(&mut txn)?;
        txn.commit();
        Ok(result)
    }
}

/// A staged view over the ledger inside [`Ledger::transact`].
///
/// Reads see staged writes first, then committed state. Writes accumulate
/// in the stage until the transaction closure returns `Ok`.
pub struct LedgerTxn<'a> {
    base: &'a mut LedgerInner,
    staged_orders: HashMap<OrderId, Order>,
    staged_disputes: HashMap<DisputeId, Dispute>,
}

impl LedgerTxn<'_> {
    /// Read an order, staged-first.
    pub fn order(&self, id: &OrderId) -> Result<Order, EscrowError> {
        self.staged_orders
            .get(id)
            .or_else(|| self.base.orders.get(id))
            .cloned()
            .ok_or_else(|| EscrowError::order_not_found(id))
    }

    /// Stage an order write.
    pub fn put_order(&mut self, order: Order) {
        self.staged_orders.insert(order.id, order);
    }

    /// Read a dispute, staged-first.
    pub fn dispute(&self, id: &DisputeId) -> Result<Dispute, EscrowError> {
        self.staged_disputes
            .get(id)
            .or_else(|| self.base.disputes.get(id))
            .cloned()
            .ok_or_else(|| EscrowError::dispute_not_found(id))
    }

    /// Stage a dispute write.
    pub fn put_dispute(&mut self, dispute: Dispute) {
        self.staged_disputes.insert(dispute.id, dispute);
    }

    /// The OPEN dispute on an order as this transaction sees it: staged
    /// versions shadow committed ones.
    pub fn open_dispute_for(&self, order_id: &OrderId) -> Option<Dispute> {
        let staged = self
            .staged_disputes
            .values()
            .find(|d| d.order_id == *order_id && d.status == DisputeStatus::Open);
        staged
            .or_else(|| {
                self.base.disputes.values().find(|d| {
                    d.order_id == *order_id
                        && d.status == DisputeStatus::Open
                        && !self.staged_disputes.contains_key(&d.id)
                })
            })
            .cloned()
    }

    fn commit(self) {
        for (id, order) in self.staged_orders {
            self.base.orders.insert(id, order);
        }
        for (id, dispute) in self.staged_disputes {
            self.base.disputes.insert(id, dispute);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrowd_core::{Amount, Role, Timestamp};
    use escrowd_crypto::{OtpCode, OtpHash, PasswordHash};

    fn test_user(phone: &str, email: Option<&str>) -> User {
        User::new(
            "test".to_string(),
            phone.to_string(),
            email.map(str::to_string),
            PasswordHash::new("pw"),
            Role::Buyer,
            Timestamp::now(),
        )
    }

    fn test_order() -> Order {
        Order::new(
            UserId::new(),
            UserId::new(),
            Amount::new("50").unwrap(),
            None,
            OtpHash::from_code(&OtpCode::new("123456").unwrap()),
            Timestamp::now(),
        )
    }

    #[test]
    fn duplicate_phone_rejected() {
        let ledger = Ledger::new();
        ledger.insert_user(test_user("+1555", None)).unwrap();
        let err = ledger.insert_user(test_user("+1555", None)).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput(_)));
    }

    #[test]
    fn duplicate_email_rejected() {
        let ledger = Ledger::new();
        ledger
            .insert_user(test_user("+1555", Some("a@example.com")))
            .unwrap();
        let err = ledger
            .insert_user(test_user("+1556", Some("a@example.com")))
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput(_)));
        // Distinct emails are fine.
        ledger
            .insert_user(test_user("+1557", Some("b@example.com")))
            .unwrap();
    }

    #[test]
    fn find_user_by_phone_or_email() {
        let ledger = Ledger::new();
        let user = test_user("+1555", Some("a@example.com"));
        let id = user.id;
        ledger.insert_user(user).unwrap();

        assert_eq!(ledger.find_user_by_identifier("+1555").unwrap().id, id);
        assert_eq!(
            ledger.find_user_by_identifier("a@example.com").unwrap().id,
            id
        );
        assert!(ledger.find_user_by_identifier("missing").is_none());
    }

    #[test]
    fn guarded_update_commits_on_ok() {
        let ledger = Ledger::new();
        let order = test_order();
        let id = order.id;
        ledger.insert_order(order);

        let updated = ledger
            .update_order_guarded(&id, OrderStatus::Created, |o| o.cancel(Timestamp::now()))
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Cancelled);
        assert_eq!(ledger.get_order(&id).unwrap().status, OrderStatus::Cancelled);
    }

    #[test]
    fn guarded_update_conflicts_on_stale_expectation() {
        let ledger = Ledger::new();
        let order = test_order();
        let id = order.id;
        ledger.insert_order(order);

        // First writer wins.
        ledger
            .update_order_guarded(&id, OrderStatus::Created, |o| o.cancel(Timestamp::now()))
            .unwrap();

        // Second writer still expects CREATED and must lose explicitly.
        let err = ledger
            .update_order_guarded(&id, OrderStatus::Created, |o| o.cancel(Timestamp::now()))
            .unwrap_err();
        assert!(matches!(err, EscrowError::Conflict { kind: "order", .. }));
    }

    #[test]
    fn guarded_update_rolls_back_on_closure_error() {
        let ledger = Ledger::new();
        let order = test_order();
        let id = order.id;
        ledger.insert_order(order.clone());

        let err = ledger
            .update_order_guarded(&id, OrderStatus::Created, |o| {
                o.cancel(Timestamp::now())?;
                Err(EscrowError::InvalidInput("forced failure".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidInput(_)));
        // The draft mutation must not have leaked into the store.
        assert_eq!(ledger.get_order(&id).unwrap().status, OrderStatus::Created);
    }

    #[test]
    fn guarded_update_unknown_order_not_found() {
        let ledger = Ledger::new();
        let err = ledger
            .update_order_guarded(&OrderId::new(), OrderStatus::Created, |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, EscrowError::NotFound { kind: "order", .. }));
    }

    #[test]
    fn transact_discards_stage_on_error() {
        let ledger = Ledger::new();
        let order = test_order();
        let id = order.id;
        ledger.insert_order(order);

        let result: Result<(), EscrowError> = ledger.transact(|txn| {
            let mut order = txn.order(&id)?;
            order
                .record_payment("cash".to_string(), None, Timestamp::now())
                .unwrap();
            txn.put_order(order.clone());
            let dispute = Dispute::new(
                id,
                UserId::new(),
                "item never arrived".to_string(),
                Timestamp::now(),
            );
            txn.put_dispute(dispute);
            Err(EscrowError::InvalidInput("abort".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(ledger.get_order(&id).unwrap().status, OrderStatus::Created);
        assert!(ledger.disputes_where(|_| true).is_empty());
    }

    #[test]
    fn transact_applies_stage_on_ok() {
        let ledger = Ledger::new();
        let order = test_order();
        let id = order.id;
        ledger.insert_order(order);

        let dispute_id = ledger
            .transact(|txn| {
                let mut order = txn.order(&id)?;
                order.record_payment("cash".to_string(), None, Timestamp::now())?;
                order.mark_disputed(Timestamp::now())?;
                txn.put_order(order);
                let dispute = Dispute::new(
                    id,
                    UserId::new(),
                    "item never arrived".to_string(),
                    Timestamp::now(),
                );
                let dispute_id = dispute.id;
                txn.put_dispute(dispute);
                Ok(dispute_id)
            })
            .unwrap();

        assert_eq!(ledger.get_order(&id).unwrap().status, OrderStatus::Disputed);
        assert_eq!(
            ledger.get_dispute(&dispute_id).unwrap().status,
            DisputeStatus::Open
        );
    }

    #[test]
    fn staged_reads_shadow_committed_state() {
        let ledger = Ledger::new();
        let order = test_order();
        let id = order.id;
        ledger.insert_order(order);

        ledger
            .transact(|txn| {
                let mut order = txn.order(&id)?;
                order.record_payment("cash".to_string(), None, Timestamp::now())?;
                txn.put_order(order);
                // A second read inside the transaction sees the stage.
                assert_eq!(txn.order(&id)?.status, OrderStatus::PaidEscrowLocked);

                let dispute = Dispute::new(id, UserId::new(), "reason".to_string(), Timestamp::now());
                txn.put_dispute(dispute.clone());
                assert_eq!(
                    txn.open_dispute_for(&id).map(|d| d.id),
                    Some(dispute.id)
                );
                Ok(())
            })
            .unwrap();
    }
}
