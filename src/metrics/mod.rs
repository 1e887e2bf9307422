//! Timing accuracy metrics for countdown sessions
//!
//! Ticks are expected to drift; these numbers show by how much, and how
//! close to the target instant playback actually started.

use crate::clock::EpochMillis;

/// Playback starting later than this is logged as a warning
pub const FIRE_LATENESS_WARN_MS: i64 = 50;

/// Per-session tick and fire timing
#[derive(Debug, Default, Clone)]
pub struct SessionMetrics {
    tick_count: u64,
    last_tick: Option<EpochMillis>,
    max_tick_jitter_ms: i64,
    fire_lateness_ms: Option<i64>,
}

impl SessionMetrics {
    /// Empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tick sampled at `now`, given the expected cadence
    pub fn record_tick(&mut self, now: EpochMillis, expected_interval_ms: i64) {
        if let Some(last) = self.last_tick {
            let jitter = ((now - last) - expected_interval_ms).abs();
            self.max_tick_jitter_ms = self.max_tick_jitter_ms.max(jitter);
        }
        self.last_tick = Some(now);
        self.tick_count += 1;
    }

    /// Record when playback fired relative to its target
    pub fn record_fire(&mut self, now: EpochMillis, target: EpochMillis) {
        self.fire_lateness_ms = Some(now - target);
    }

    /// Number of ticks sampled
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Largest deviation between consecutive ticks and the cadence
    pub fn max_tick_jitter_ms(&self) -> i64 {
        self.max_tick_jitter_ms
    }

    /// How late playback fired (negative means early), once fired
    pub fn fire_lateness_ms(&self) -> Option<i64> {
        self.fire_lateness_ms
    }

    /// Whether the fire missed the target by more than the warning budget
    pub fn is_fire_late(&self) -> bool {
        self.fire_lateness_ms
            .is_some_and(|late| late.abs() > FIRE_LATENESS_WARN_MS)
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Log a summary of the session
    pub fn log_summary(&self) {
        tracing::debug!(
            ticks = %self.tick_count,
            max_tick_jitter_ms = %self.max_tick_jitter_ms,
            fire_lateness_ms = ?self.fire_lateness_ms,
            "Countdown timing summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_jitter() {
        let mut metrics = SessionMetrics::new();

        metrics.record_tick(1_000, 1_000);
        assert_eq!(metrics.max_tick_jitter_ms(), 0);

        metrics.record_tick(2_030, 1_000);
        metrics.record_tick(2_990, 1_000);
        assert_eq!(metrics.tick_count(), 3);
        assert_eq!(metrics.max_tick_jitter_ms(), 40);
    }

    #[test]
    fn test_fire_lateness() {
        let mut metrics = SessionMetrics::new();
        assert_eq!(metrics.fire_lateness_ms(), None);
        assert!(!metrics.is_fire_late());

        metrics.record_fire(12_004, 12_000);
        assert_eq!(metrics.fire_lateness_ms(), Some(4));
        assert!(!metrics.is_fire_late());

        metrics.record_fire(12_200, 12_000);
        assert!(metrics.is_fire_late());
    }

    #[test]
    fn test_reset() {
        let mut metrics = SessionMetrics::new();
        metrics.record_tick(1, 1_000);
        metrics.record_fire(2, 2);
        metrics.reset();
        assert_eq!(metrics.tick_count(), 0);
        assert_eq!(metrics.fire_lateness_ms(), None);
    }
}
