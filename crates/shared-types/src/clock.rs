//! Clock abstraction.
//!
//! OTP and session expiry are evaluated lazily against wall-clock time, so
//! every component that compares against "now" takes a [`Clock`] instead of
//! calling the system clock directly. Tests drive a [`ManualClock`] to cross
//! expiry boundaries without sleeping.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Timestamps are UTC and serialize as RFC 3339, the persisted format.
pub type Timestamp = DateTime<Utc>;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Current time as unix milliseconds (case-id generation).
    fn now_unix_millis(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }
}

/// Production clock reading system time.
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Test clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
