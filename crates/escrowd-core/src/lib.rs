#![deny(missing_docs)]

//! # escrowd-core — Foundational Types for Escrowd
//!
//! This crate defines the foundational types that every other crate in the
//! workspace depends on. It has no internal crate dependencies — only `serde`,
//! `thiserror`, `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass a [`UserId`] where an [`OrderId`] is
//!    expected.
//!
//! 2. **Closed vocabularies.** Roles and decision outcomes are enums, never
//!    free strings. The transition graph and authorization matrix are
//!    exhaustively matchable at compile time.
//!
//! 3. **No floats for money.** [`Amount`] is a validated decimal string;
//!    floating-point monetary values are unrepresentable.
//!
//! 4. **[`EscrowError`] taxonomy.** Structured errors with `thiserror` — no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests. Every failure an engine
//!    can produce is one of these variants, and the transport mapping over
//!    them is total.

pub mod amount;
pub mod clock;
pub mod error;
pub mod identity;
pub mod role;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use amount::Amount;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::EscrowError;
pub use identity::{DisputeId, OrderId, UserId};
pub use role::Role;
pub use temporal::Timestamp;
