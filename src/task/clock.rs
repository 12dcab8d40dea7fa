//! Creation timestamps.
//!
//! # Invariants
//! - Every value returned by `tick()` is strictly greater than every value
//!   previously returned by the same clock or used to seed it.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Millisecond clock that never hands out the same timestamp twice.
#[derive(Debug)]
pub struct Clock {
    last: AtomicI64,
}

impl Clock {
    /// Create a clock whose first tick is greater than `timestamp`.
    ///
    /// Used after loading persisted data so new entities sort after old ones.
    pub fn starting_after(timestamp: i64) -> Self {
        Self {
            last: AtomicI64::new(timestamp),
        }
    }

    /// Issue the next timestamp: wall-clock milliseconds, bumped forward when
    /// the wall clock has not advanced past the last issued value.
    pub fn tick(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let next = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
