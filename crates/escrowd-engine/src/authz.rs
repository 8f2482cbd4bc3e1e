//! # Authorization Guard
//!
//! Pure allow/deny predicates over (actor, action, resource). Two
//! independent dimensions are evaluated: role membership (only a BUYER may
//! create orders, only an ADMIN may resolve disputes) and resource
//! ownership (the actor must be the order's buyer, a party to it, and so
//! on). Nothing here reads or writes the ledger; the engines consult the
//! guard before every operation, and the matrix is testable without any
//! transition logic in the loop.

use escrowd_core::{EscrowError, Role, UserId};

use crate::order::Order;

/// The authenticated principal attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The caller's user id.
    pub id: UserId,
    /// The caller's role.
    pub role: Role,
}

impl Actor {
    /// Construct an actor.
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Operations on an existing order that require authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    /// Read the order.
    View,
    /// Record payment into escrow.
    Pay,
    /// Present the delivery-proof code.
    ConfirmDelivery,
    /// Release escrowed funds to the seller.
    Release,
    /// Cancel before funds are locked.
    Cancel,
}

/// Whether the actor is the buyer or the seller of the order.
fn is_party(actor: &Actor, order: &Order) -> bool {
    actor.id == order.buyer_id || actor.id == order.seller_id
}

/// Whether the actor may create a new order. Only buyers open escrows.
pub fn check_create_order(actor: &Actor) -> Result<(), EscrowError> {
    if actor.role == Role::Buyer {
        Ok(())
    } else {
        Err(EscrowError::Unauthorized(format!(
            "role BUYER required to create orders, caller has {}",
            actor.role
        )))
    }
}

/// Whether the actor may perform `action` on `order`.
pub fn check_order(actor: &Actor, action: OrderAction, order: &Order) -> Result<(), EscrowError> {
    let allowed = match action {
        OrderAction::View => actor.role.is_admin() || is_party(actor, order),
        // Payment and delivery confirmation belong to the buyer alone —
        // an admin cannot assert receipt of goods on the buyer's behalf.
        OrderAction::Pay | OrderAction::ConfirmDelivery => {
            actor.role == Role::Buyer && actor.id == order.buyer_id
        }
        OrderAction::Release => {
            actor.role.is_admin() || (actor.role == Role::Buyer && actor.id == order.buyer_id)
        }
        OrderAction::Cancel => actor.role.is_admin() || is_party(actor, order),
    };
    if allowed {
        Ok(())
    } else {
        Err(EscrowError::Unauthorized(match action {
            OrderAction::View => "not a party to this order".to_string(),
            OrderAction::Pay => "only the buyer may pay for this order".to_string(),
            OrderAction::ConfirmDelivery => {
                "only the buyer may confirm delivery of this order".to_string()
            }
            OrderAction::Release => "only the buyer or an administrator may release funds".to_string(),
            OrderAction::Cancel => "not authorized to cancel this order".to_string(),
        }))
    }
}

/// Whether the actor may open a dispute on `order`. Only the parties to
/// the trade may dispute it; administrators arbitrate, they do not file.
pub fn check_open_dispute(actor: &Actor, order: &Order) -> Result<(), EscrowError> {
    if is_party(actor, order) {
        Ok(())
    } else {
        Err(EscrowError::Unauthorized(
            "only the buyer or seller of the order may open a dispute".to_string(),
        ))
    }
}

/// Whether the actor may view a dispute on `order`. The opener is always a
/// party, so party-or-admin covers creator, counterparty, and arbitrator.
pub fn check_view_dispute(actor: &Actor, order: &Order) -> Result<(), EscrowError> {
    if actor.role.is_admin() || is_party(actor, order) {
        Ok(())
    } else {
        Err(EscrowError::Unauthorized(
            "not a party to the disputed order".to_string(),
        ))
    }
}

/// Whether the actor may resolve disputes. Administrator only.
pub fn check_resolve_dispute(actor: &Actor) -> Result<(), EscrowError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(EscrowError::Unauthorized(format!(
            "role ADMIN required to resolve disputes, caller has {}",
            actor.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrowd_core::{Amount, Timestamp};
    use escrowd_crypto::{OtpCode, OtpHash};

    fn order_between(buyer: UserId, seller: UserId) -> Order {
        Order::new(
            buyer,
            seller,
            Amount::new("100.00").unwrap(),
            Some("keyboard".to_string()),
            OtpHash::from_code(&OtpCode::new("482913").unwrap()),
            Timestamp::now(),
        )
    }

    fn actors() -> (Actor, Actor, Actor, Actor, Order) {
        let buyer = Actor::new(UserId::new(), Role::Buyer);
        let seller = Actor::new(UserId::new(), Role::Seller);
        let admin = Actor::new(UserId::new(), Role::Admin);
        let stranger = Actor::new(UserId::new(), Role::Buyer);
        let order = order_between(buyer.id, seller.id);
        (buyer, seller, admin, stranger, order)
    }

    #[test]
    fn only_buyers_create_orders() {
        let (buyer, seller, admin, _, _) = actors();
        assert!(check_create_order(&buyer).is_ok());
        assert!(check_create_order(&seller).is_err());
        assert!(check_create_order(&admin).is_err());
    }

    #[test]
    fn view_is_party_or_admin() {
        let (buyer, seller, admin, stranger, order) = actors();
        assert!(check_order(&buyer, OrderAction::View, &order).is_ok());
        assert!(check_order(&seller, OrderAction::View, &order).is_ok());
        assert!(check_order(&admin, OrderAction::View, &order).is_ok());
        assert!(check_order(&stranger, OrderAction::View, &order).is_err());
    }

    #[test]
    fn pay_and_confirm_are_buyer_only() {
        let (buyer, seller, admin, stranger, order) = actors();
        for action in [OrderAction::Pay, OrderAction::ConfirmDelivery] {
            assert!(check_order(&buyer, action, &order).is_ok());
            assert!(check_order(&seller, action, &order).is_err());
            assert!(check_order(&admin, action, &order).is_err());
            assert!(check_order(&stranger, action, &order).is_err());
        }
    }

    #[test]
    fn release_is_owning_buyer_or_admin() {
        let (buyer, seller, admin, stranger, order) = actors();
        assert!(check_order(&buyer, OrderAction::Release, &order).is_ok());
        assert!(check_order(&admin, OrderAction::Release, &order).is_ok());
        assert!(check_order(&seller, OrderAction::Release, &order).is_err());
        assert!(check_order(&stranger, OrderAction::Release, &order).is_err());
    }

    #[test]
    fn cancel_is_party_or_admin() {
        let (buyer, seller, admin, stranger, order) = actors();
        assert!(check_order(&buyer, OrderAction::Cancel, &order).is_ok());
        assert!(check_order(&seller, OrderAction::Cancel, &order).is_ok());
        assert!(check_order(&admin, OrderAction::Cancel, &order).is_ok());
        assert!(check_order(&stranger, OrderAction::Cancel, &order).is_err());
    }

    #[test]
    fn disputes_open_by_parties_only() {
        let (buyer, seller, admin, stranger, order) = actors();
        assert!(check_open_dispute(&buyer, &order).is_ok());
        assert!(check_open_dispute(&seller, &order).is_ok());
        assert!(check_open_dispute(&admin, &order).is_err());
        assert!(check_open_dispute(&stranger, &order).is_err());
    }

    #[test]
    fn dispute_visibility_covers_both_parties_and_admin() {
        let (buyer, seller, admin, stranger, order) = actors();
        assert!(check_view_dispute(&buyer, &order).is_ok());
        assert!(check_view_dispute(&seller, &order).is_ok());
        assert!(check_view_dispute(&admin, &order).is_ok());
        assert!(check_view_dispute(&stranger, &order).is_err());
    }

    #[test]
    fn resolution_is_admin_only() {
        let (buyer, seller, admin, stranger, _) = actors();
        assert!(check_resolve_dispute(&admin).is_ok());
        assert!(check_resolve_dispute(&buyer).is_err());
        assert!(check_resolve_dispute(&seller).is_err());
        assert!(check_resolve_dispute(&stranger).is_err());
    }

    #[test]
    fn ownership_is_checked_per_order_not_per_role() {
        // A buyer who owns some other order is still a stranger here.
        let (_, seller, _, other_buyer, _) = actors();
        let order = order_between(UserId::new(), seller.id);
        assert!(check_order(&other_buyer, OrderAction::Pay, &order).is_err());
    }
}
