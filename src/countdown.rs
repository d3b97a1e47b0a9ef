use std::fmt;
use std::time::Duration;

/// Remaining time below which the countdown is shown as a warning.
pub const WARNING_THRESHOLD: u64 = 300;

/// Session countdown. Display only: reaching zero locks nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total: u64,
    remaining: u64,
}

impl Countdown {
    pub fn new(total_seconds: u64) -> Self {
        Self {
            total: total_seconds,
            remaining: total_seconds,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Set remaining time from wall-clock time elapsed since the start,
    /// stopping at zero, and return it.
    pub fn remaining_after(&mut self, elapsed: Duration) -> u64 {
        self.remaining = self.total.saturating_sub(elapsed.as_secs());
        self.remaining
    }

    pub fn is_warning(&self) -> bool {
        self.remaining < WARNING_THRESHOLD
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}
