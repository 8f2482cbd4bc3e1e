//! # Middleware
//!
//! Tower middleware for the Escrowd API:
//!
//! - `rate_limit` — token-bucket limiter keyed by authenticated caller,
//!   the guard-layer throttle that bounds delivery-code guessing.
//! - `metrics` — request/error counters.

pub mod metrics;
pub mod rate_limit;
