//! # Error Taxonomy
//!
//! The closed error vocabulary for the escrow engines, built with
//! `thiserror`. Every failure an engine operation can produce is one of
//! these variants; the transport layer maps the enumeration totally onto
//! HTTP status classes. No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Each variant carries enough context for operators to diagnose the
//! failure without inspecting logs: the entity involved, the state at the
//! time of failure, and the operation that was attempted.

use thiserror::Error;

/// Errors arising from escrow and dispute operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// An entity id did not resolve to a stored record.
    #[error("{kind} {id} not found")]
    NotFound {
        /// The entity kind ("user", "order", "dispute").
        kind: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// A role or ownership check failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested transition is not reachable from the current status.
    #[error("cannot {operation} while order is {status}")]
    InvalidState {
        /// The attempted operation (e.g., "release", "cancel").
        operation: &'static str,
        /// The current status name.
        status: String,
    },

    /// Input validation failed (non-positive amount, malformed seller,
    /// missing required field).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The presented delivery-proof code does not match the stored hash.
    #[error("delivery code does not match")]
    InvalidOtp,

    /// The order already has an open dispute.
    #[error("order {order_id} already has open dispute {dispute_id}")]
    DisputeAlreadyOpen {
        /// The disputed order.
        order_id: String,
        /// The dispute that is already open.
        dispute_id: String,
    },

    /// The dispute was already resolved.
    #[error("dispute {dispute_id} already resolved as {status}")]
    AlreadyResolved {
        /// The dispute identifier.
        dispute_id: String,
        /// The resolution it already carries.
        status: String,
    },

    /// The resolution decision is not one of REFUND / RELEASE.
    #[error("unsupported decision: \"{0}\" (expected REFUND or RELEASE)")]
    InvalidDecision(String),

    /// An optimistic precondition was lost to a concurrent writer: the
    /// status observed when the operation began no longer matched at
    /// commit time.
    #[error("{kind} {id} was modified concurrently (expected status {expected})")]
    Conflict {
        /// The entity kind ("order", "dispute").
        kind: &'static str,
        /// The entity identifier.
        id: String,
        /// The status the operation expected to still hold.
        expected: String,
    },
}

impl EscrowError {
    /// Shorthand for a [`EscrowError::NotFound`] over an order id.
    pub fn order_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "order",
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`EscrowError::NotFound`] over a dispute id.
    pub fn dispute_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "dispute",
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`EscrowError::NotFound`] over a user id.
    pub fn user_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "user",
            id: id.to_string(),
        }
    }
}
