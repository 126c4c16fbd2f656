//! Interval kinematics
//!
//! Closed-form reductions over one detected run:
//! - distance: sum of counts × unit conversion
//! - mean speed per minute: mean count × unit conversion × samples per minute
//! - energy proxy: sum of squared counts × conversion² / Δt²

use std::ops::Range;

use crate::error::ComputeError;
use crate::types::IntervalStats;

/// Default wheel turns-to-metres factor
pub const DEFAULT_UNIT_CONVERSION: f64 = 0.456;

/// Default sample cadence (seconds)
pub const DEFAULT_SAMPLE_PERIOD_SECS: f64 = 5.0;

/// Calculator for per-run statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicsCalculator {
    sample_period_secs: f64,
    unit_conversion: f64,
}

impl Default for KinematicsCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_PERIOD_SECS, DEFAULT_UNIT_CONVERSION)
    }
}

impl KinematicsCalculator {
    pub fn new(sample_period_secs: f64, unit_conversion: f64) -> Self {
        Self {
            sample_period_secs,
            unit_conversion,
        }
    }

    pub fn sample_period_secs(&self) -> f64 {
        self.sample_period_secs
    }

    pub fn unit_conversion(&self) -> f64 {
        self.unit_conversion
    }

    /// Samples per minute at the configured cadence
    pub fn samples_per_minute(&self) -> f64 {
        60.0 / self.sample_period_secs
    }

    /// Convert one raw count into speed per minute
    pub fn speed_per_minute(&self, count: f64) -> f64 {
        count * self.unit_conversion * self.samples_per_minute()
    }

    /// Statistics for `trace[range]`, `day_index` counted from 0
    pub fn compute(
        &self,
        trace: &[f64],
        range: Range<usize>,
        day_index: usize,
    ) -> Result<IntervalStats, ComputeError> {
        if range.start >= range.end || range.end > trace.len() {
            return Err(ComputeError::EmptyInterval {
                start: range.start,
                stop: range.end,
            });
        }

        let slice = &trace[range.clone()];
        let n = slice.len() as f64;
        let dt = self.sample_period_secs;
        let c = self.unit_conversion;

        let sum: f64 = slice.iter().sum();
        let sum_sq: f64 = slice.iter().map(|v| v * v).sum();

        Ok(IntervalStats {
            training_week: (day_index / 7) as u32 + 1,
            period_start_minutes: range.start as f64 * dt / 60.0,
            period_length_seconds: n * dt,
            distance: sum * c,
            mean_speed_per_minute: (sum / n) * c * self.samples_per_minute(),
            energy_proxy: sum_sq * c * c / (dt * dt),
        })
    }
}
