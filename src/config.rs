//! Analysis configuration
//!
//! Every tunable of a run lives here and is threaded explicitly through the
//! pipeline stages; nothing is process-global. Configurations serialize to
//! JSON, and any field missing from a JSON document takes its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::DayNightAggregator;
use crate::bursts::{BurstConfig, DEFAULT_ACTIVITY_THRESHOLD};
use crate::calendar::DayCalendar;
use crate::error::ComputeError;
use crate::kinematics::{KinematicsCalculator, DEFAULT_SAMPLE_PERIOD_SECS, DEFAULT_UNIT_CONVERSION};
use crate::schema::SampleTable;
use crate::types::{TimeOfDay, DEFAULT_EVENING, DEFAULT_MORNING};
use crate::windows::RecurringWindow;

/// Time span to analyse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisRange {
    /// Everything from the first to the last sample
    #[default]
    Full,
    /// Explicit epoch-second bounds, both inclusive
    Between { start: i64, end: i64 },
}

/// Full configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Start of the conventional day
    pub day_start: TimeOfDay,
    /// Lights-on window
    pub light: RecurringWindow,
    /// Night window
    pub night: RecurringWindow,
    /// Minimum quiet time that ends a run (seconds)
    pub min_retire_secs: f64,
    /// Counts-to-distance factor (e.g. wheel turns to metres)
    pub unit_conversion: f64,
    /// Sample cadence (seconds)
    pub sample_period_secs: f64,
    /// Samples strictly above this value are active
    pub activity_threshold: f64,
    /// Local time offset east of UTC (minutes), fixed for the whole run
    pub utc_offset_minutes: i32,
    pub range: AnalysisRange,
    /// Process subjects on a worker pool
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::from_schedule(DEFAULT_MORNING, DEFAULT_EVENING)
    }
}

impl AnalysisConfig {
    /// Classic schedule: the day starts at `morning`, light is
    /// `[morning, evening)` and night is `[evening, morning)`.
    pub fn from_schedule(morning: TimeOfDay, evening: TimeOfDay) -> Self {
        Self {
            day_start: morning,
            light: RecurringWindow::new(morning, evening),
            night: RecurringWindow::new(evening, morning),
            min_retire_secs: 0.0,
            unit_conversion: DEFAULT_UNIT_CONVERSION,
            sample_period_secs: DEFAULT_SAMPLE_PERIOD_SECS,
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            utc_offset_minutes: 0,
            range: AnalysisRange::Full,
            parallel: false,
        }
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.sample_period_secs.is_finite() && self.sample_period_secs > 0.0) {
            return Err(ComputeError::ConfigError(format!(
                "sample_period_secs must be positive, got {}",
                self.sample_period_secs
            )));
        }
        if !(self.unit_conversion.is_finite() && self.unit_conversion > 0.0) {
            return Err(ComputeError::ConfigError(format!(
                "unit_conversion must be positive, got {}",
                self.unit_conversion
            )));
        }
        if !(self.min_retire_secs.is_finite() && self.min_retire_secs >= 0.0) {
            return Err(ComputeError::ConfigError(format!(
                "min_retire_secs must be non-negative, got {}",
                self.min_retire_secs
            )));
        }
        if !self.activity_threshold.is_finite() {
            return Err(ComputeError::ConfigError(
                "activity_threshold must be finite".to_string(),
            ));
        }
        if let AnalysisRange::Between { start, end } = self.range {
            if start >= end {
                return Err(ComputeError::InvalidRange { start, end });
            }
        }
        self.calendar()?;
        Ok(())
    }

    pub fn calendar(&self) -> Result<DayCalendar, ComputeError> {
        DayCalendar::with_offset_minutes(self.utc_offset_minutes, self.day_start)
    }

    pub fn burst_config(&self) -> BurstConfig {
        BurstConfig::from_retire_duration(
            self.activity_threshold,
            self.min_retire_secs,
            self.sample_period_secs,
        )
    }

    pub fn kinematics(&self) -> KinematicsCalculator {
        KinematicsCalculator::new(self.sample_period_secs, self.unit_conversion)
    }

    pub fn aggregator(&self) -> Result<DayNightAggregator, ComputeError> {
        Ok(DayNightAggregator::new(self.calendar()?, self.light, self.night))
    }

    /// Concrete `[start, end]` for a table
    pub fn resolve_range(&self, table: &SampleTable) -> Result<(i64, i64), ComputeError> {
        match self.range {
            AnalysisRange::Between { start, end } => {
                if start >= end {
                    return Err(ComputeError::InvalidRange { start, end });
                }
                Ok((start, end))
            }
            AnalysisRange::Full => match (table.first_timestamp(), table.last_timestamp()) {
                (Some(start), Some(end)) if start < end => Ok((start, end)),
                (Some(start), Some(end)) => Err(ComputeError::InvalidRange { start, end }),
                _ => Err(ComputeError::RangeOutsideData("table is empty".to_string())),
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_schedule() {
        let config = AnalysisConfig::default();
        assert_eq!(config.day_start.to_string(), "09:00");
        assert_eq!(config.light.from.to_string(), "09:00");
        assert_eq!(config.light.to.to_string(), "20:53");
        assert_eq!(config.night.from.to_string(), "20:53");
        assert_eq!(config.night.to.to_string(), "09:00");
        assert!(config.night.is_wrapping());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AnalysisConfig::from_json(
            r#"{ "min_retire_secs": 10, "unit_conversion": 0.5, "range": { "kind": "between", "start": 0, "end": 86400 } }"#,
        )
        .unwrap();
        assert_eq!(config.min_retire_secs, 10.0);
        assert_eq!(config.unit_conversion, 0.5);
        assert_eq!(config.sample_period_secs, 5.0);
        assert_eq!(config.range, AnalysisRange::Between { start: 0, end: 86400 });
        assert_eq!(config.burst_config().min_quiet_samples, 2);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AnalysisConfig {
            utc_offset_minutes: 180,
            parallel: true,
            ..AnalysisConfig::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"20:53\""));
        assert_eq!(AnalysisConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validation_failures() {
        let bad_period = AnalysisConfig {
            sample_period_secs: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(bad_period.validate(), Err(ComputeError::ConfigError(_))));

        let bad_range = AnalysisConfig {
            range: AnalysisRange::Between { start: 10, end: 10 },
            ..AnalysisConfig::default()
        };
        assert!(matches!(bad_range.validate(), Err(ComputeError::InvalidRange { .. })));

        let bad_offset = AnalysisConfig {
            utc_offset_minutes: 100_000,
            ..AnalysisConfig::default()
        };
        assert!(bad_offset.validate().is_err());

        // minutes that overflow once converted to seconds
        let huge_offset = AnalysisConfig {
            utc_offset_minutes: 71_582_788,
            ..AnalysisConfig::default()
        };
        assert!(matches!(huge_offset.validate(), Err(ComputeError::ConfigError(_))));
        assert!(DayCalendar::with_offset_minutes(i32::MIN, DEFAULT_MORNING).is_err());

        assert!(AnalysisConfig::from_json(r#"{ "day_start": "26:00" }"#).is_err());
    }

    #[test]
    fn test_resolve_full_range() {
        let table = SampleTable::from_columns(vec![100, 105, 110], vec![vec![0.0; 3]]).unwrap();
        let config = AnalysisConfig::default();
        assert_eq!(config.resolve_range(&table).unwrap(), (100, 110));

        let single = SampleTable::from_columns(vec![100], vec![vec![0.0]]).unwrap();
        assert!(config.resolve_range(&single).is_err());
    }
}
