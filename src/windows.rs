//! Recurring sub-daily windows
//!
//! Instantiates a time-of-day window `[from, to)` once per day boundary.
//! A window whose `to` is at or before its `from` crosses midnight: it begins
//! on day N at `from` and ends on day N+1 at `to`. Windows are placed relative
//! to the day boundary's lower bound, so the sequence is strictly increasing
//! and non-overlapping. The last window is truncated at the final day's upper
//! bound.
//!
//! Light and night windows are resolved independently of each other and of
//! the day boundaries; [`check_disjoint`] verifies two families do not
//! overlap once assembled.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ComputeError;
use crate::types::{DayBoundary, TimeOfDay, WindowInterval, WindowLabel, MINUTES_PER_DAY};

/// Time-of-day window `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringWindow {
    pub from: TimeOfDay,
    pub to: TimeOfDay,
}

impl RecurringWindow {
    pub fn new(from: TimeOfDay, to: TimeOfDay) -> Self {
        Self { from, to }
    }

    fn from_minutes(&self) -> u32 {
        self.from.minutes() % MINUTES_PER_DAY
    }

    fn to_minutes(&self) -> u32 {
        self.to.minutes() % MINUTES_PER_DAY
    }

    /// Whether the window crosses local midnight
    pub fn is_wrapping(&self) -> bool {
        self.to_minutes() <= self.from_minutes()
    }

    /// Window width in minutes
    pub fn width_minutes(&self) -> Result<u32, ComputeError> {
        let (from, to) = (self.from_minutes(), self.to_minutes());
        if from == to {
            return Err(ComputeError::DegenerateWindow {
                from_minutes: self.from.minutes(),
                to_minutes: self.to.minutes(),
            });
        }
        Ok((to + MINUTES_PER_DAY - from) % MINUTES_PER_DAY)
    }

    /// One absolute interval per day boundary.
    ///
    /// `day_start` must be the anchor the boundaries were generated with.
    pub fn resolve(
        &self,
        day_start: TimeOfDay,
        days: &[DayBoundary],
    ) -> Result<Vec<WindowInterval>, ComputeError> {
        let width = self.width_minutes()? as i64 * 60;
        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            return Ok(Vec::new());
        };

        let anchor = day_start.minutes() % MINUTES_PER_DAY;
        let lead = ((self.from_minutes() + MINUTES_PER_DAY - anchor) % MINUTES_PER_DAY) as i64 * 60;
        let (lower, upper) = (first.lower, last.upper);

        let intervals: Vec<WindowInterval> = days
            .iter()
            .map(|day| {
                let begin = (day.lower + lead).max(lower);
                let end = (day.lower + lead + width).min(upper);
                WindowInterval { begin, end }
            })
            .collect();

        debug!(
            from = %self.from,
            to = %self.to,
            wrapping = self.is_wrapping(),
            count = intervals.len(),
            "resolved recurring window"
        );
        Ok(intervals)
    }
}

/// Fail on the first overlap between two sorted window families
pub fn check_disjoint(
    first_label: WindowLabel,
    first: &[WindowInterval],
    second_label: WindowLabel,
    second: &[WindowInterval],
) -> Result<(), ComputeError> {
    let (mut i, mut j) = (0, 0);
    while i < first.len() && j < second.len() {
        let (a, b) = (&first[i], &second[j]);
        if a.overlaps(b) {
            return Err(ComputeError::OverlappingWindows {
                first: first_label.as_str().to_string(),
                first_begin: a.begin,
                first_end: a.end,
                second: second_label.as_str().to_string(),
                second_begin: b.begin,
                second_end: b.end,
            });
        }
        if a.end <= b.end {
            i += 1;
        } else {
            j += 1;
        }
    }
    Ok(())
}
