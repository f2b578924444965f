//! # Connection Backoff Schedule
//!
//! Delay sequence used by the supervisor while waiting for a node to become
//! reachable and synced.
//!
//! ## Formula
//!
//! ```text
//! delay[0] = 1000
//! delay[n] = delay[n-1] * 2 + 1000       (n >= 1)
//!          = 1000 * (2^(n+1) - 1)
//! ```
//!
//! The first probe happens [`INITIAL_PROBE_MS`] after the loop starts; the
//! schedule only governs re-checks.
//!
//! ## Invariants
//!
//! 1. Strictly increasing until `u64` saturation (or the optional cap).
//! 2. No overflow: all arithmetic saturates.
//! 3. Deterministic: no jitter, no clock.

/// Delay before the very first probe (milliseconds).
pub const INITIAL_PROBE_MS: u64 = 100;

/// Additive step of every re-check delay (milliseconds).
pub const BACKOFF_STEP_MS: u64 = 1000;

/// Stateful iterator over re-check delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    previous_ms: u64,
    attempts: u32,
    max_delay_ms: Option<u64>,
}

impl BackoffSchedule {
    pub fn new() -> Self {
        Self {
            previous_ms: 0,
            attempts: 0,
            max_delay_ms: None,
        }
    }

    /// Schedule that never exceeds `max_delay_ms`.
    pub fn with_cap(max_delay_ms: u64) -> Self {
        Self {
            max_delay_ms: Some(max_delay_ms),
            ..Self::new()
        }
    }

    /// Advances and returns the next delay in milliseconds.
    pub fn next_delay(&mut self) -> u64 {
        let mut next = self
            .previous_ms
            .saturating_mul(2)
            .saturating_add(BACKOFF_STEP_MS);
        if let Some(cap) = self.max_delay_ms {
            next = next.min(cap);
        }
        self.previous_ms = next;
        self.attempts = self.attempts.saturating_add(1);
        next
    }

    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Last delay handed out (0 before the first).
    pub fn current_ms(&self) -> u64 {
        self.previous_ms
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for BackoffSchedule {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.next_delay())
    }
}

/// Closed form of the `n`-th delay (0-indexed), uncapped.
pub fn delay_at(n: u32) -> u64 {
    let factor = 1u64.checked_shl(n.saturating_add(1)).unwrap_or(u64::MAX);
    BACKOFF_STEP_MS.saturating_mul(factor.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delays_match_formula() {
        let delays: Vec<u64> = BackoffSchedule::new().take(5).collect();
        assert_eq!(delays, vec![1000, 3000, 7000, 15000, 31000]);
    }

    #[test]
    fn each_delay_is_previous_doubled_plus_step() {
        let delays: Vec<u64> = BackoffSchedule::new().take(40).collect();
        assert_eq!(delays[0], 1000);
        for n in 1..delays.len() {
            assert_eq!(delays[n], delays[n - 1] * 2 + 1000);
            assert!(delays[n] > delays[n - 1]);
        }
    }

    #[test]
    fn closed_form_agrees_with_iterator() {
        for (n, d) in BackoffSchedule::new().take(30).enumerate() {
            assert_eq!(delay_at(n as u32), d);
        }
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let mut schedule = BackoffSchedule::new();
        let mut last = 0;
        for _ in 0..200 {
            last = schedule.next_delay();
        }
        assert_eq!(last, u64::MAX);
        assert_eq!(delay_at(500), u64::MAX);
    }

    #[test]
    fn cap_bounds_every_delay() {
        let delays: Vec<u64> = BackoffSchedule::with_cap(10_000).take(6).collect();
        assert_eq!(delays, vec![1000, 3000, 7000, 10_000, 10_000, 10_000]);
    }

    #[test]
    fn attempts_and_current_track_progress() {
        let mut schedule = BackoffSchedule::new();
        assert_eq!(schedule.attempts(), 0);
        assert_eq!(schedule.current_ms(), 0);
        schedule.next_delay();
        schedule.next_delay();
        assert_eq!(schedule.attempts(), 2);
        assert_eq!(schedule.current_ms(), 3000);
    }
}
