//! Activity burst detection
//!
//! Segments a per-sample activity trace into runs separated by quiet gaps.
//!
//! Design: three-state machine, one step per sample
//! - `Idle`: waiting for an active sample (value strictly above the threshold)
//! - `Running`: inside a run
//! - `PendingRetire`: inside a run but the trace has gone quiet; the run ends
//!   at the first quiet sample once the quiet streak reaches
//!   `min_quiet_samples`, and resumes if activity returns sooner (debounce)
//!
//! A run still open at the end of the trace is reported up to the trace end.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Default activity threshold (counts per sample)
pub const DEFAULT_ACTIVITY_THRESHOLD: f64 = 0.01;

/// Burst detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstConfig {
    /// Samples strictly above this value are active
    pub activity_threshold: f64,
    /// Consecutive quiet samples required to end a run (at least 1)
    pub min_quiet_samples: usize,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            min_quiet_samples: 1,
        }
    }
}

impl BurstConfig {
    /// Derive the quiet-sample count from a minimum retirement duration.
    ///
    /// The count is `ceil(min_retire_secs / sample_period_secs)`, at least 1.
    pub fn from_retire_duration(activity_threshold: f64, min_retire_secs: f64, sample_period_secs: f64) -> Self {
        let samples = if sample_period_secs > 0.0 && min_retire_secs > 0.0 {
            (min_retire_secs / sample_period_secs).ceil() as usize
        } else {
            1
        };
        Self {
            activity_threshold,
            min_quiet_samples: samples.max(1),
        }
    }
}

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstState {
    Idle,
    Running { start: usize },
    PendingRetire { start: usize, retire_start: usize },
}

/// Incremental burst detector
#[derive(Debug, Clone)]
pub struct BurstDetector {
    config: BurstConfig,
    state: BurstState,
    position: usize,
}

impl BurstDetector {
    pub fn new(config: BurstConfig) -> Self {
        Self {
            config: BurstConfig {
                min_quiet_samples: config.min_quiet_samples.max(1),
                ..config
            },
            state: BurstState::Idle,
            position: 0,
        }
    }

    pub fn state(&self) -> BurstState {
        self.state
    }

    /// Feed the next sample; returns a run when one retires
    pub fn step(&mut self, value: f64) -> Option<Range<usize>> {
        let x = self.position;
        self.position += 1;
        let active = value > self.config.activity_threshold;

        let (next, emitted) = match self.state {
            BurstState::Idle if active => (BurstState::Running { start: x }, None),
            BurstState::Idle => (BurstState::Idle, None),
            BurstState::Running { start } if active => (BurstState::Running { start }, None),
            BurstState::Running { start } => self.quiet(start, x, x),
            BurstState::PendingRetire { start, .. } if active => (BurstState::Running { start }, None),
            BurstState::PendingRetire { start, retire_start } => self.quiet(start, retire_start, x),
        };

        self.state = next;
        emitted
    }

    /// Quiet sample at `x` inside a run whose quiet streak began at `retire_start`
    fn quiet(&self, start: usize, retire_start: usize, x: usize) -> (BurstState, Option<Range<usize>>) {
        if x - retire_start + 1 >= self.config.min_quiet_samples {
            (BurstState::Idle, Some(start..retire_start))
        } else {
            (BurstState::PendingRetire { start, retire_start }, None)
        }
    }

    /// Close the trace; an open run extends to the trace end
    pub fn finish(self) -> Option<Range<usize>> {
        match self.state {
            BurstState::Idle => None,
            BurstState::Running { start } | BurstState::PendingRetire { start, .. } => {
                Some(start..self.position)
            }
        }
    }
}

/// Detect all runs in a trace, in increasing order
pub fn detect_runs(trace: &[f64], config: &BurstConfig) -> Vec<Range<usize>> {
    let mut detector = BurstDetector::new(*config);
    let mut runs: Vec<Range<usize>> = trace.iter().filter_map(|&v| detector.step(v)).collect();
    runs.extend(detector.finish());
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(min_quiet_samples: usize) -> BurstConfig {
        BurstConfig {
            activity_threshold: 0.01,
            min_quiet_samples,
        }
    }

    #[test]
    fn test_two_runs_separated_by_quiet_gap() {
        let trace = [0.0, 0.0, 0.02, 0.03, 0.0, 0.0, 0.0, 0.05, 0.0, 0.0, 0.0];
        assert_eq!(detect_runs(&trace, &config(2)), vec![2..4, 7..8]);
    }

    #[test]
    fn test_short_dip_is_debounced() {
        let trace = [1.0, 0.0, 1.0, 0.0, 0.0];
        assert_eq!(detect_runs(&trace, &config(2)), vec![0..3]);
    }

    #[test]
    fn test_open_run_extends_to_trace_end() {
        // still pending retirement when the trace ends
        let trace = [0.0, 0.5, 0.5, 0.0];
        assert_eq!(detect_runs(&trace, &config(3)), vec![1..4]);

        // still running when the trace ends
        let trace = [0.0, 0.0, 0.5, 0.5];
        assert_eq!(detect_runs(&trace, &config(3)), vec![2..4]);
    }

    #[test]
    fn test_empty_and_quiet_traces() {
        assert!(detect_runs(&[], &config(2)).is_empty());
        assert!(detect_runs(&[0.0, 0.005, 0.01, 0.0], &config(2)).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let trace = [0.01, 0.011, 0.01];
        assert_eq!(detect_runs(&trace, &config(1)), vec![1..2]);
    }

    #[test]
    fn test_zero_quiet_samples_behaves_like_one() {
        let trace = [1.0, 0.0, 1.0];
        assert_eq!(detect_runs(&trace, &config(0)), vec![0..1, 2..3]);
        assert_eq!(detect_runs(&trace, &config(1)), vec![0..1, 2..3]);
    }

    #[test]
    fn test_state_transitions() {
        let mut detector = BurstDetector::new(config(2));
        assert_eq!(detector.state(), BurstState::Idle);
        assert_eq!(detector.step(0.5), None);
        assert_eq!(detector.state(), BurstState::Running { start: 0 });
        assert_eq!(detector.step(0.0), None);
        assert_eq!(detector.state(), BurstState::PendingRetire { start: 0, retire_start: 1 });
        assert_eq!(detector.step(0.2), None);
        assert_eq!(detector.state(), BurstState::Running { start: 0 });
        assert_eq!(detector.step(0.0), None);
        assert_eq!(detector.step(0.0), Some(0..3));
        assert_eq!(detector.state(), BurstState::Idle);
        assert_eq!(detector.finish(), None);
    }

    #[test]
    fn test_from_retire_duration() {
        assert_eq!(BurstConfig::from_retire_duration(0.01, 10.0, 5.0).min_quiet_samples, 2);
        assert_eq!(BurstConfig::from_retire_duration(0.01, 12.0, 5.0).min_quiet_samples, 3);
        assert_eq!(BurstConfig::from_retire_duration(0.01, 0.0, 5.0).min_quiet_samples, 1);
    }

    /// Deterministic pseudo-random trace with sparse activity
    fn lcg_trace(seed: u64, len: usize) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let r = (state >> 33) as f64 / (1u64 << 31) as f64;
                if r > 0.6 {
                    r * 3.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    #[test]
    fn test_run_invariants_on_generated_traces() {
        for seed in 1..20u64 {
            let trace = lcg_trace(seed, 400);
            for min_quiet in 1..6 {
                let cfg = config(min_quiet);
                let runs = detect_runs(&trace, &cfg);

                // deterministic
                assert_eq!(runs, detect_runs(&trace, &cfg));

                for run in &runs {
                    assert!(run.start < run.end);
                    assert!(trace[run.start] > cfg.activity_threshold);
                }
                for pair in runs.windows(2) {
                    // separated by a full quiet streak
                    assert!(pair[1].start - pair[0].end >= min_quiet);
                }

                // every active sample belongs to some run
                for (i, v) in trace.iter().enumerate() {
                    if *v > cfg.activity_threshold {
                        assert!(runs.iter().any(|r| r.contains(&i)), "sample {} not covered", i);
                    }
                }
            }
        }
    }
}
