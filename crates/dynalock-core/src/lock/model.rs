//! Acquire/release options and outcomes

use std::time::Duration;

use rand::Rng;

use crate::constants::{DEFAULT_LOCK_TIMEOUT, DEFAULT_RETRY_INTERVAL};
use crate::model::LockRecord;

/// Options controlling a single acquire
#[derive(Debug, Clone, PartialEq)]
pub struct AcquireOptions {
    /// Opaque owner tag recorded with the lock
    pub owner: Option<String>,
    /// How long to keep retrying before giving up
    pub timeout: Duration,
    /// Pause between two conditional-insert attempts
    pub retry_interval: Duration,
    /// Fraction in `[0, 1]` by which each pause is randomly stretched or shrunk
    pub jitter: f64,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            owner: None,
            timeout: DEFAULT_LOCK_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            jitter: 0.0,
        }
    }
}

impl AcquireOptions {
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Pause before the next attempt, saturating at `Duration::MAX`
    pub fn retry_delay(&self) -> Duration {
        let jitter = if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if jitter == 0.0 {
            return self.retry_interval;
        }

        let factor = rand::rng().random_range((1.0 - jitter)..=(1.0 + jitter));
        Duration::try_from_secs_f64(self.retry_interval.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }
}

/// Successful acquire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    /// Record written by the winning conditional insert
    pub record: LockRecord,
    /// Number of conditional inserts issued, including the winning one
    pub attempts: u32,
    /// Time spent between the first attempt and the winning one
    pub waited: Duration,
}

/// Successful release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The record existed and was deleted
    Released,
    /// No record existed; nothing was deleted
    NotHeld,
}
