#![deny(missing_docs)]

//! # escrowd-engine — The Escrow Core
//!
//! Implements the part of Escrowd with real invariants:
//!
//! - **Order** (`order.rs`): the escrow order lifecycle state machine —
//!   payment lock, delivery confirmation, release, cancellation.
//!
//! - **Dispute** (`dispute.rs`): the arbitration engine that can override
//!   the order lifecycle. Opening and resolving a dispute each mutate the
//!   dispute and its order as one transactional unit.
//!
//! - **Authorization** (`authz.rs`): pure allow/deny predicates over
//!   (actor, action, resource), kept separate from transition logic so the
//!   authorization matrix is auditable and testable on its own.
//!
//! - **Ledger** (`ledger.rs`): the persistence gateway — point lookup,
//!   filtered listing, status-guarded single-entity updates (optimistic
//!   concurrency), and a staged multi-entity transaction.
//!
//! ## Crate Policy
//!
//! - Engines are plain values constructed with explicit dependencies
//!   (ledger, code issuer, clock); nothing in this crate is a singleton.
//! - Every fallible operation returns [`escrowd_core::EscrowError`];
//!   no panics cross the crate boundary.
//! - Two concurrent writers to the same order cannot both succeed: one
//!   commits, the other observes `InvalidState` or `Conflict`.

pub mod authz;
pub mod dispute;
pub mod ledger;
pub mod order;
pub mod user;

pub use authz::Actor;
pub use dispute::{Decision, Dispute, DisputeEngine, DisputeStatus};
pub use ledger::Ledger;
pub use order::{CreatedOrder, NewOrder, Order, OrderEngine, OrderStatus};
pub use user::User;
