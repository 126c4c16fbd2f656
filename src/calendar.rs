//! Day boundary generation
//!
//! Splits an absolute time range into contiguous 24h day boundaries anchored
//! at a configurable start-of-day offset. Local time is a fixed UTC offset
//! (no DST transitions), so every day is exactly 86 400 s wide and the result
//! is reproducible regardless of the host timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::ComputeError;
use crate::types::{DayBoundary, TimeOfDay, SECONDS_PER_DAY};

/// Date-time layout accepted for analysis range bounds
pub const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Local calendar with a fixed UTC offset and a day-start anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCalendar {
    offset: FixedOffset,
    day_start: TimeOfDay,
}

impl DayCalendar {
    pub fn new(offset: FixedOffset, day_start: TimeOfDay) -> Self {
        Self { offset, day_start }
    }

    /// Calendar from an offset in minutes east of UTC
    pub fn with_offset_minutes(offset_minutes: i32, day_start: TimeOfDay) -> Result<Self, ComputeError> {
        let offset = offset_minutes.checked_mul(60).and_then(FixedOffset::east_opt).ok_or_else(|| {
            ComputeError::ConfigError(format!("UTC offset {} min out of range", offset_minutes))
        })?;
        Ok(Self::new(offset, day_start))
    }

    pub fn day_start(&self) -> TimeOfDay {
        self.day_start
    }

    fn offset_secs(&self) -> i64 {
        self.offset.local_minus_utc() as i64
    }

    /// Ordered day boundaries covering `[range_start, range_end]`.
    ///
    /// The first lower bound is the nearest anchor at or before `range_start`;
    /// boundaries are emitted while their lower bound is before `range_end`,
    /// so the last upper bound is at or after `range_end`.
    pub fn day_boundaries(&self, range_start: i64, range_end: i64) -> Result<Vec<DayBoundary>, ComputeError> {
        if range_start >= range_end {
            return Err(ComputeError::InvalidRange {
                start: range_start,
                end: range_end,
            });
        }

        let anchor = self.day_start.seconds() % SECONDS_PER_DAY;
        let offset = self.offset_secs();
        let local_start = range_start + offset;
        let first_lower_local =
            (local_start - anchor).div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY + anchor;

        let mut days = Vec::new();
        let mut lower = first_lower_local - offset;
        while lower < range_end {
            days.push(DayBoundary {
                lower,
                upper: lower + SECONDS_PER_DAY,
            });
            lower += SECONDS_PER_DAY;
        }

        debug!(
            day_start = %self.day_start,
            count = days.len(),
            "formed day boundaries for [{}, {}]",
            range_start,
            range_end
        );
        Ok(days)
    }

    /// Local midnight at or before `ts`, as epoch seconds
    pub fn local_midnight(&self, ts: i64) -> i64 {
        let offset = self.offset_secs();
        (ts + offset).div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY - offset
    }

    /// Local calendar date of `ts`
    pub fn local_date(&self, ts: i64) -> Result<NaiveDate, ComputeError> {
        DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.with_timezone(&self.offset).date_naive())
            .ok_or_else(|| ComputeError::DateParseError(format!("timestamp {} out of range", ts)))
    }

    /// Parse "dd.mm.YYYY HH:MM" in this calendar's offset, or raw epoch seconds
    pub fn parse_datetime(&self, s: &str) -> Result<i64, ComputeError> {
        let trimmed = s.trim();
        if let Ok(ts) = trimmed.parse::<i64>() {
            return Ok(ts);
        }
        let naive = NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
            .map_err(|e| ComputeError::DateParseError(format!("{:?}: {}", s, e)))?;
        naive
            .and_local_timezone(self.offset)
            .single()
            .map(|dt| dt.timestamp())
            .ok_or_else(|| ComputeError::DateParseError(format!("{:?} is ambiguous", s)))
    }

    /// Render `ts` as "dd.mm.YYYY HH:MM" local time
    pub fn format(&self, ts: i64) -> String {
        match DateTime::from_timestamp(ts, 0) {
            Some(dt) => dt.with_timezone(&self.offset).format(DATETIME_FORMAT).to_string(),
            None => ts.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn utc_calendar(day_start: &str) -> DayCalendar {
        DayCalendar::with_offset_minutes(0, day_start.parse().unwrap()).unwrap()
    }

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().timestamp()
    }

    #[test]
    fn test_exactly_three_days() {
        let cal = utc_calendar("00:00");
        let start = ts(2024, 1, 15, 0, 0);
        let days = cal.day_boundaries(start, start + 3 * SECONDS_PER_DAY).unwrap();

        assert_eq!(days.len(), 3);
        assert_eq!(days[0].lower, start);
        assert_eq!(days[2].upper, start + 3 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_start_snaps_back_to_anchor() {
        let cal = utc_calendar("09:00");
        let start = ts(2024, 1, 15, 7, 30);
        let end = ts(2024, 1, 16, 10, 0);
        let days = cal.day_boundaries(start, end).unwrap();

        assert_eq!(days[0].lower, ts(2024, 1, 14, 9, 0));
        assert_eq!(days.last().unwrap().upper, ts(2024, 1, 17, 9, 0));
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn test_boundaries_are_contiguous_and_cover_range() {
        for offset_min in [-300, 0, 180] {
            for anchor in ["00:00", "06:15", "09:00", "23:59"] {
                let cal = DayCalendar::with_offset_minutes(offset_min, anchor.parse().unwrap()).unwrap();
                for (start, len) in [(1_700_000_000, 3_600), (1_700_012_345, 5 * SECONDS_PER_DAY + 17)] {
                    let end = start + len;
                    let days = cal.day_boundaries(start, end).unwrap();

                    assert!(days[0].lower <= start);
                    assert!(days.last().unwrap().upper >= end);
                    for d in &days {
                        assert_eq!(d.upper - d.lower, SECONDS_PER_DAY);
                        // anchored at the day start in local time
                        let local = d.lower + offset_min as i64 * 60;
                        let anchor_secs = anchor.parse::<TimeOfDay>().unwrap().seconds();
                        assert_eq!(local.rem_euclid(SECONDS_PER_DAY), anchor_secs);
                    }
                    for pair in days.windows(2) {
                        assert_eq!(pair[0].upper, pair[1].lower);
                    }
                }
            }
        }
    }

    #[test]
    fn test_invalid_range() {
        let cal = utc_calendar("00:00");
        assert!(matches!(
            cal.day_boundaries(100, 100),
            Err(ComputeError::InvalidRange { start: 100, end: 100 })
        ));
        assert!(cal.day_boundaries(200, 100).is_err());
    }

    #[test]
    fn test_offset_shifts_anchor() {
        // UTC+3: local 00:00 is 21:00 UTC the previous day
        let cal = DayCalendar::with_offset_minutes(180, "00:00".parse().unwrap()).unwrap();
        let start = ts(2024, 1, 15, 12, 0);
        let days = cal.day_boundaries(start, start + 1).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].lower, ts(2024, 1, 14, 21, 0));
    }

    #[test]
    fn test_local_midnight_and_date() {
        let cal = DayCalendar::with_offset_minutes(180, "09:00".parse().unwrap()).unwrap();
        let t = ts(2024, 1, 15, 22, 30); // 01:30 local on the 16th
        assert_eq!(cal.local_midnight(t), ts(2024, 1, 15, 21, 0));
        assert_eq!(cal.local_date(t).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }

    #[test]
    fn test_parse_and_format_datetime() {
        let cal = DayCalendar::with_offset_minutes(180, "09:00".parse().unwrap()).unwrap();
        let t = cal.parse_datetime("16.01.2024 01:30").unwrap();
        assert_eq!(t, ts(2024, 1, 15, 22, 30));
        assert_eq!(cal.format(t), "16.01.2024 01:30");
        assert_eq!(cal.parse_datetime("1705357800").unwrap(), 1_705_357_800);
        assert!(cal.parse_datetime("2024-01-16").is_err());
    }
}
