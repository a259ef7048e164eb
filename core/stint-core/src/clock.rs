//! Wall-clock sources.
//!
//! Engines and the store never call `Utc::now()` directly; they ask a [`Clock`].
//! Production uses [`SystemClock`]; tests and simulations use [`ManualClock`].

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Supplies "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    /// Moves the clock forward and returns the new instant.
    pub fn advance(&self, by: std::time::Duration) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + Duration::from_std(by).unwrap_or(Duration::zero());
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Non-negative span between two instants. Backwards clock jumps clamp to zero.
pub fn span_between(from: DateTime<Utc>, to: DateTime<Utc>) -> std::time::Duration {
    to.signed_duration_since(from)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}
