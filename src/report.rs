//! Text renderings of analysis results
//!
//! Fixed-width and CSV interval tables, per-day aggregate tables and the
//! night listing. JSON output lives in [`crate::encoder`].

use std::fmt::Write as _;

use crate::calendar::DayCalendar;
use crate::types::{AggregateTable, IntervalRecord, NightSummary};

const INTERVAL_SEPARATOR: &str = "#------|---------|--------|---------|---------|---------";

/// CSV header; the leading empty column holds the row index
pub const CSV_HEADER: &str = ",subjectId,trainingWeek,periodStart,periodLength,distance,speed,energy";

/// Fixed-width interval table headed by the source name
pub fn interval_table(source: &str, records: &[IntervalRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}|||||", source);
    let _ = writeln!(
        out,
        "{:<7}| {:>8}| {:>7}| {:>8}| {:>8}| {:>8}",
        "Tr.week", "Beg.,min", "Int.T,s", "S, m", "V, m/min", "E, m2/s2"
    );
    let _ = writeln!(out, "{}", INTERVAL_SEPARATOR);
    for r in records {
        let _ = writeln!(
            out,
            "{:<7}| {:>8.1}| {:>7}| {:>8.2}| {:>8.2}| {:>8.2}",
            r.training_week,
            r.period_start_minutes,
            r.period_length_seconds as i64,
            r.distance,
            r.mean_speed_per_minute,
            r.energy_proxy
        );
    }
    let _ = writeln!(out, "{}", INTERVAL_SEPARATOR);
    out
}

/// Interval table as CSV with a leading row index
pub fn interval_csv(records: &[IntervalRecord]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for (i, r) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            i,
            r.subject_id,
            r.training_week,
            r.period_start_minutes,
            r.period_length_seconds,
            r.distance,
            r.mean_speed_per_minute,
            r.energy_proxy
        );
    }
    out
}

/// One line per day: local date, then each subject's total
pub fn aggregate_table(table: &AggregateTable) -> String {
    let mut out = String::new();
    let _ = write!(out, "# {:<10}", table.label.as_str());
    for subject in &table.subjects {
        let _ = write!(out, " {:>12}", subject);
    }
    out.push('\n');
    for row in &table.rows {
        let _ = write!(out, "{:<12}", row.date.format("%d.%m.%Y"));
        for total in &row.totals {
            let _ = write!(out, " {:>12.2}", total);
        }
        out.push('\n');
    }
    out
}

/// Night windows with their clipped duration and per-subject distance
pub fn night_listing(nights: &[NightSummary], calendar: &DayCalendar) -> String {
    let mut out = String::new();
    for night in nights {
        let _ = write!(
            out,
            "{}: {} - {}  --  {}",
            night.day_index,
            calendar.format(night.window.begin),
            calendar.format(night.window.end),
            night.duration
        );
        for d in &night.distances {
            let _ = write!(out, "  {:.2}", d);
        }
        out.push('\n');
    }
    out
}

/// Heading line naming the analysed span
pub fn range_heading(calendar: &DayCalendar, start: i64, end: i64) -> String {
    format!("Extracted interval from {} to {}", calendar.format(start), calendar.format(end))
}
