//! Core types for the Wheel Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: day boundaries, recurring window intervals, aggregate tables,
//! detected runs and the final interval records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ComputeError;

/// Seconds in one (fixed-offset) calendar day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Minutes in one calendar day
pub const MINUTES_PER_DAY: u32 = 1_440;

/// Default start of the day and of the light window
pub const DEFAULT_MORNING: TimeOfDay = TimeOfDay(9 * 60);

/// Default start of the night window
pub const DEFAULT_EVENING: TimeOfDay = TimeOfDay(20 * 60 + 53);

/// Subject identifier (one per data column)
pub type SubjectId = String;

/// Offset from local midnight, in whole minutes (0..=1440).
///
/// Serialized as "HH:MM". "24:00" is accepted and behaves like "00:00" in
/// window arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub fn from_minutes(minutes: u32) -> Result<Self, ComputeError> {
        if minutes > MINUTES_PER_DAY {
            return Err(ComputeError::InvalidTimeOfDay(format!(
                "{} minutes exceeds 24:00",
                minutes
            )));
        }
        Ok(Self(minutes))
    }

    pub fn from_hm(hours: u32, minutes: u32) -> Result<Self, ComputeError> {
        if minutes >= 60 {
            return Err(ComputeError::InvalidTimeOfDay(format!(
                "{:02}:{:02} has more than 59 minutes",
                hours, minutes
            )));
        }
        Self::from_minutes(hours * 60 + minutes)
    }

    /// Minutes since local midnight
    pub fn minutes(&self) -> u32 {
        self.0
    }

    /// Seconds since local midnight
    pub fn seconds(&self) -> i64 {
        self.0 as i64 * 60
    }
}

impl FromStr for TimeOfDay {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ComputeError::InvalidTimeOfDay(format!("expected HH:MM, got {:?}", s)))?;
        let hours: u32 = h
            .parse()
            .map_err(|_| ComputeError::InvalidTimeOfDay(format!("bad hours in {:?}", s)))?;
        let minutes: u32 = m
            .parse()
            .map_err(|_| ComputeError::InvalidTimeOfDay(format!("bad minutes in {:?}", s)))?;
        Self::from_hm(hours, minutes)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// One 24h day span anchored at the configured day-start offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBoundary {
    /// Inclusive lower bound (epoch seconds)
    pub lower: i64,
    /// Exclusive upper bound (epoch seconds)
    pub upper: i64,
}

impl DayBoundary {
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.lower && ts < self.upper
    }
}

/// Which recurring window family an interval or aggregate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLabel {
    Day,
    Light,
    Night,
}

impl WindowLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowLabel::Day => "day",
            WindowLabel::Light => "light",
            WindowLabel::Night => "night",
        }
    }
}

/// One occurrence of a recurring sub-daily window, `[begin, end)` in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInterval {
    pub begin: i64,
    pub end: i64,
}

impl WindowInterval {
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.begin && ts < self.end
    }

    pub fn duration_secs(&self) -> i64 {
        self.end - self.begin
    }

    /// Intersect with `[lower, upper)`; `None` when nothing is left
    pub fn clip(&self, lower: i64, upper: i64) -> Option<WindowInterval> {
        let begin = self.begin.max(lower);
        let end = self.end.min(upper);
        (begin < end).then_some(WindowInterval { begin, end })
    }

    pub fn overlaps(&self, other: &WindowInterval) -> bool {
        self.begin < other.end && other.begin < self.end
    }
}

/// Detected burst inside one night window for one subject.
///
/// Indices point into that window's trace slice; `stop` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInterval {
    pub subject: SubjectId,
    pub day_index: usize,
    pub start: usize,
    pub stop: usize,
}

/// Kinematic statistics derived from one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    /// 1-based training week
    pub training_week: u32,
    /// Run start, minutes from night-window start
    pub period_start_minutes: f64,
    /// Run length in seconds
    pub period_length_seconds: f64,
    pub distance: f64,
    pub mean_speed_per_minute: f64,
    pub energy_proxy: f64,
}

/// One row of the interval output table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalRecord {
    pub subject_id: SubjectId,
    pub training_week: u32,
    pub period_start_minutes: f64,
    pub period_length_seconds: f64,
    pub distance: f64,
    pub mean_speed_per_minute: f64,
    pub energy_proxy: f64,
}

impl IntervalRecord {
    pub fn new(subject_id: SubjectId, stats: IntervalStats) -> Self {
        Self {
            subject_id,
            training_week: stats.training_week,
            period_start_minutes: stats.period_start_minutes,
            period_length_seconds: stats.period_length_seconds,
            distance: stats.distance,
            mean_speed_per_minute: stats.mean_speed_per_minute,
            energy_proxy: stats.energy_proxy,
        }
    }
}

/// Per-day aggregate row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Local midnight of the day boundary's lower bound (epoch seconds)
    pub day_label: i64,
    /// Local calendar date of the day boundary's lower bound
    pub date: NaiveDate,
    /// One total per subject, in table column order
    pub totals: Vec<f64>,
}

/// Per-day totals for one window family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    pub label: WindowLabel,
    pub subjects: Vec<SubjectId>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// Total for one subject on one day
    pub fn total(&self, day_index: usize, subject: &str) -> Result<f64, ComputeError> {
        let column = self
            .subjects
            .iter()
            .position(|s| s == subject)
            .ok_or_else(|| ComputeError::UnknownSubject(subject.to_string()))?;
        let row = self
            .rows
            .get(day_index)
            .ok_or(ComputeError::DayIndexOutOfRange {
                index: day_index,
                count: self.rows.len(),
            })?;
        Ok(row.totals[column])
    }
}

/// Non-fatal condition surfaced to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub label: WindowLabel,
    pub message: String,
}

/// Output of the masking & aggregation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayNightTotals {
    pub days: Vec<DayBoundary>,
    pub light_windows: Vec<WindowInterval>,
    pub night_windows: Vec<WindowInterval>,
    pub day: AggregateTable,
    pub light: AggregateTable,
    pub night: AggregateTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-night overview: clipped bounds plus total distance per subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightSummary {
    pub day_index: usize,
    pub window: WindowInterval,
    /// Clipped duration as "HH:MM"
    pub duration: String,
    /// Distance per subject, in table column order
    pub distances: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_parse() {
        let t: TimeOfDay = "20:53".parse().unwrap();
        assert_eq!(t.minutes(), 20 * 60 + 53);
        assert_eq!(t.to_string(), "20:53");

        let t: TimeOfDay = "9:00".parse().unwrap();
        assert_eq!(t.minutes(), 540);
        assert_eq!(t.to_string(), "09:00");

        assert_eq!("24:00".parse::<TimeOfDay>().unwrap().minutes(), 1440);
    }

    #[test]
    fn test_time_of_day_rejects_garbage() {
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("10:60".parse::<TimeOfDay>().is_err());
        assert!("1000".parse::<TimeOfDay>().is_err());
        assert!("ab:cd".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_time_of_day_serde_roundtrip_as_string() {
        let t = TimeOfDay::from_hm(7, 5).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"07:05\"");
        let back: TimeOfDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_window_clip() {
        let w = WindowInterval { begin: 100, end: 200 };
        assert_eq!(w.clip(150, 300), Some(WindowInterval { begin: 150, end: 200 }));
        assert_eq!(w.clip(0, 120), Some(WindowInterval { begin: 100, end: 120 }));
        assert_eq!(w.clip(200, 300), None);
        assert_eq!(w.clip(0, 100), None);
    }

    #[test]
    fn test_aggregate_total_lookup() {
        let table = AggregateTable {
            label: WindowLabel::Day,
            subjects: vec!["1".to_string(), "2".to_string()],
            rows: vec![AggregateRow {
                day_label: 0,
                date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
                totals: vec![3.0, 4.0],
            }],
        };
        assert_eq!(table.total(0, "2").unwrap(), 4.0);
        assert!(matches!(
            table.total(0, "9"),
            Err(ComputeError::UnknownSubject(_))
        ));
        assert!(matches!(
            table.total(5, "1"),
            Err(ComputeError::DayIndexOutOfRange { index: 5, count: 1 })
        ));
    }
}
