// ABOUTME: Absolute deadline shared by every phase of one lifecycle request.
// ABOUTME: Monotonic for arithmetic, with a wall-clock copy for messages.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use super::error::{ProvisionError, TimeoutSnafu};

// Budgets too large to represent are capped here.
const MAX_BUDGET: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A point in time computed once from a relative budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    wall: DateTime<Utc>,
}

impl Deadline {
    /// The deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        let budget = budget.min(MAX_BUDGET);
        let wall = TimeDelta::from_std(budget)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            at: Instant::now() + budget,
            wall,
        }
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Wall-clock instant of expiry.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.wall
    }

    /// Time left for `phase`, or a timeout if there is none.
    ///
    /// Blocking calls take their limit from here, so nothing is ever started
    /// with a zero timeout.
    pub fn time_left(&self, phase: &'static str) -> Result<Duration, ProvisionError> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(self.expired(phase));
        }
        Ok(remaining)
    }

    /// Fail with a timeout if the deadline has passed.
    pub fn check(&self, phase: &'static str) -> Result<(), ProvisionError> {
        self.time_left(phase).map(|_| ())
    }

    pub(crate) fn expired(&self, phase: &'static str) -> ProvisionError {
        TimeoutSnafu {
            phase,
            deadline: self.wall,
        }
        .build()
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wall.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}
