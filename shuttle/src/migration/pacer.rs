//! Adaptive inter-batch pacing (spec §4.6 "Adaptive pacing").
//!
//! No teacher counterpart; grounded on the bounded-interval retry shape implied
//! by the teacher's `ResolverRefresher` periodic-refresh loop (spec §4.6
//! implementation notes).

use std::time::Duration;

const INITIAL_INTERVAL_MS: u64 = 500;
const MIN_INTERVAL_MS: u64 = 100;
const MAX_INTERVAL_MS: u64 = 5000;
/// Bounds the failure backoff exponent so `2^n` never overflows `u64`.
const MAX_CONSECUTIVE_FAILURES: u32 = 16;

pub struct AdaptivePacer {
    interval_ms: u64,
    consecutive_failures: u32,
}

impl Default for AdaptivePacer {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptivePacer {
    pub fn new() -> Self {
        Self {
            interval_ms: INITIAL_INTERVAL_MS,
            consecutive_failures: 0,
        }
    }

    /// A successful batch whose average per-record time is < 0.5x the current
    /// interval speeds up by 0.8x; `consecutiveFailures` resets on any success.
    pub fn on_batch_success(&mut self, avg_per_record_ms: f64) {
        self.consecutive_failures = 0;
        if avg_per_record_ms < 0.5 * self.interval_ms as f64 {
            self.interval_ms = ((self.interval_ms as f64) * 0.8) as u64;
        }
        self.interval_ms = self.interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
    }

    /// A failed batch multiplies the interval by `2^consecutiveFailures` (capped).
    pub fn on_failure(&mut self) {
        self.consecutive_failures = (self.consecutive_failures + 1).min(MAX_CONSECUTIVE_FAILURES);
        let factor = 1u64 << self.consecutive_failures;
        self.interval_ms = self.interval_ms.saturating_mul(factor).clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
    }

    pub fn next_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_five_hundred_ms() {
        assert_eq!(AdaptivePacer::new().next_interval(), Duration::from_millis(500));
    }

    #[test]
    fn fast_batch_speeds_up_by_point_eight() {
        let mut pacer = AdaptivePacer::new();
        pacer.on_batch_success(10.0);
        assert_eq!(pacer.next_interval(), Duration::from_millis(400));
    }

    #[test]
    fn failure_backs_off_exponentially_and_resets_on_success() {
        let mut pacer = AdaptivePacer::new();
        pacer.on_failure();
        assert_eq!(pacer.next_interval(), Duration::from_millis(1000));
        pacer.on_failure();
        assert_eq!(pacer.next_interval(), Duration::from_millis(4000));
        pacer.on_batch_success(1.0);
        assert_eq!(pacer.next_interval(), Duration::from_millis(3200));
    }

    #[test]
    fn interval_never_exceeds_the_upper_bound() {
        let mut pacer = AdaptivePacer::new();
        for _ in 0..10 {
            pacer.on_failure();
        }
        assert_eq!(pacer.next_interval(), Duration::from_millis(MAX_INTERVAL_MS));
    }
}
