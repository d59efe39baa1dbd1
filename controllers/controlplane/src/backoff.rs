//! # Exponential Backoff
//!
//! Provides the delay sequence used between operation polls.
//! Delays grow geometrically from an initial value and are capped, so a
//! quick operation is observed quickly while a slow cluster create does not
//! hammer the API.
//!
//! Calculations are performed in milliseconds.
//! Default poll sequence: 2s, 4s, 8s, 16s, 30s (max), 30s, ...

use std::time::Duration;

/// Exponential backoff calculator
///
/// Each backoff is the previous one times `multiplier`, capped at `max_millis`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Current backoff value in milliseconds
    current_millis: u64,
    /// Maximum backoff value in milliseconds
    max_millis: u64,
    /// Growth factor between consecutive values
    multiplier: u64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff
    ///
    /// # Arguments
    ///
    /// * `initial` - First delay returned
    /// * `max` - Cap for every delay
    /// * `multiplier` - Growth factor (values below 1 are treated as 1)
    #[must_use]
    pub fn new(initial: Duration, max: Duration, multiplier: u32) -> Self {
        let initial_millis = duration_millis(initial);
        Self {
            current_millis: initial_millis,
            max_millis: duration_millis(max).max(initial_millis),
            multiplier: u64::from(multiplier.max(1)),
        }
    }

    /// Get the next backoff duration in milliseconds and advance the sequence
    pub fn next_backoff_millis(&mut self) -> u64 {
        let result = self.current_millis;
        self.current_millis = self
            .current_millis
            .saturating_mul(self.multiplier)
            .min(self.max_millis);
        result
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_millis())
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
