//! Run metrics

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub duration_ms: u64,
}

impl PhaseTiming {
    pub fn new(phase: Phase, elapsed: Duration) -> Self {
        Self {
            phase,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Mean time to resolution in ms; 0 when nothing was fixed
pub fn mean_time_to_resolution(total_ms: u64, violations_fixed: usize) -> f64 {
    if violations_fixed == 0 {
        0.0
    } else {
        total_ms as f64 / violations_fixed as f64
    }
}

/// (before − after) / before × 100; 0 when before is 0
pub fn improvement_percent(before: usize, after: usize) -> f64 {
    if before == 0 {
        0.0
    } else {
        (before as f64 - after as f64) / before as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub phase_durations: Vec<PhaseTiming>,
    pub total_ms: u64,
    pub violations_before: usize,
    pub violations_after: usize,
    pub fixes_successful: usize,
    pub violations_fixed: usize,
    pub mttr_ms: f64,
    pub improvement_percent: f64,
    /// Estimated manual effort for the successful fixes
    pub manual_minutes: f64,
    pub automated_minutes: f64,
    /// Manual estimate minus actual run time; negative when slower
    pub time_saved_minutes: f64,
}

impl RunMetrics {
    pub fn compute(
        phase_durations: Vec<PhaseTiming>,
        total: Duration,
        violations_before: usize,
        violations_after: usize,
        fixes_successful: usize,
        violations_fixed: usize,
        manual_fix_minutes: f64,
    ) -> Self {
        let total_ms = total.as_millis() as u64;
        let manual_minutes = fixes_successful as f64 * manual_fix_minutes;
        let automated_minutes = total_ms as f64 / 60_000.0;
        Self {
            phase_durations,
            total_ms,
            violations_before,
            violations_after,
            fixes_successful,
            violations_fixed,
            mttr_ms: mean_time_to_resolution(total_ms, violations_fixed),
            improvement_percent: improvement_percent(violations_before, violations_after),
            manual_minutes,
            automated_minutes,
            time_saved_minutes: manual_minutes - automated_minutes,
        }
    }

    pub fn phase_ms(&self, phase: Phase) -> Option<u64> {
        self.phase_durations
            .iter()
            .find(|t| t.phase == phase)
            .map(|t| t.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mttr_zero_when_nothing_fixed() {
        assert_eq!(mean_time_to_resolution(12_000, 0), 0.0);
        assert_eq!(mean_time_to_resolution(12_000, 4), 3_000.0);
    }

    #[test]
    fn test_improvement_percent() {
        assert_eq!(improvement_percent(20, 5), 75.0);
        assert_eq!(improvement_percent(0, 0), 0.0);
        assert_eq!(improvement_percent(4, 6), -50.0);
    }

    #[test]
    fn test_time_saved() {
        let metrics = RunMetrics::compute(
            vec![PhaseTiming::new(Phase::Detect, Duration::from_millis(250))],
            Duration::from_secs(120),
            10,
            2,
            3,
            8,
            35.0,
        );
        assert_eq!(metrics.manual_minutes, 105.0);
        assert_eq!(metrics.automated_minutes, 2.0);
        assert_eq!(metrics.time_saved_minutes, 103.0);
        assert_eq!(metrics.mttr_ms, 15_000.0);
        assert_eq!(metrics.phase_ms(Phase::Detect), Some(250));
        assert_eq!(metrics.phase_ms(Phase::Learn), None);
    }
}
