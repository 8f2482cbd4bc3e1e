//! # API Route Modules
//!
//! Route modules for the Escrowd API surface:
//!
//! - `users` — identity provider endpoints: registration and login
//!   (unauthenticated), profile, admin user listing and deactivation.
//! - `orders` — escrow order lifecycle: create, list, get, pay, confirm
//!   delivery, release, cancel.
//! - `disputes` — arbitration: open, list, get, resolve.
//!
//! Handlers are thin: extract + validate the body, hand the caller's
//! [`crate::auth::CallerIdentity`] and the request to the engines, map the
//! result. No business logic lives here.

pub mod disputes;
pub mod orders;
pub mod users;
