//! Wall-clock time derived from the tokio timer
//!
//! Deadlines and ages are compared against `Clock::now()`, which advances with
//! `tokio::time::Instant`. When the runtime clock is paused, policies and
//! timers therefore move together.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    base_wall: DateTime<Utc>,
    base_instant: Instant,
}

impl Clock {
    /// A clock anchored at the current wall time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// A clock reading `wall` right now
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            base_wall: wall,
            base_instant: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed =
            TimeDelta::from_std(self.base_instant.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
        self.base_wall + elapsed
    }
}

/// Converts a std duration, saturating at the largest representable delta
pub fn to_delta(d: std::time::Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
