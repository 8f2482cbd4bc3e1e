//! # Clock
//!
//! Time source injected into the engines at construction. Production code
//! uses [`SystemClock`]; tests substitute a fixed clock so that `paid_at`,
//! `released_at`, and `resolved_at` assertions are deterministic.

use crate::temporal::Timestamp;

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current moment according to this clock.
    fn now(&self) -> Timestamp;
}

/// The real system clock (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock pinned to a single instant. Test double.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(
    /// The pinned instant.
    pub Timestamp,
);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
