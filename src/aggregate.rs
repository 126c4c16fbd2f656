//! Masking and aggregation
//!
//! Buckets samples into per-day totals for every subject column:
//! - whole day (by day boundary)
//! - light window resolved for that day
//! - night window resolved for that day
//!
//! Samples and windows are both sorted, so each bucket is a contiguous row
//! range located by binary search over the timestamp index. A window family
//! that cannot be resolved yields zero totals and a [`Diagnostic`] instead of
//! aborting the whole aggregation.

use std::ops::Range;

use tracing::{info, warn};

use crate::calendar::DayCalendar;
use crate::error::ComputeError;
use crate::schema::SampleTable;
use crate::types::{
    AggregateRow, AggregateTable, DayBoundary, DayNightTotals, Diagnostic, WindowInterval,
    WindowLabel,
};
use crate::windows::{check_disjoint, RecurringWindow};

/// Aggregator for day / light / night totals
#[derive(Debug, Clone)]
pub struct DayNightAggregator {
    calendar: DayCalendar,
    light: RecurringWindow,
    night: RecurringWindow,
}

impl DayNightAggregator {
    pub fn new(calendar: DayCalendar, light: RecurringWindow, night: RecurringWindow) -> Self {
        Self {
            calendar,
            light,
            night,
        }
    }

    /// Aggregate samples in `[range_start, range_end]` (inclusive)
    pub fn aggregate(
        &self,
        table: &SampleTable,
        range_start: i64,
        range_end: i64,
    ) -> Result<DayNightTotals, ComputeError> {
        if range_start >= range_end {
            return Err(ComputeError::InvalidRange {
                start: range_start,
                end: range_end,
            });
        }
        // inclusive end: a sample sitting on the next anchor opens one more day
        let range_stop = range_end.saturating_add(1);
        let days = self.calendar.day_boundaries(range_start, range_stop)?;
        let in_range = table.index_range(range_start, range_stop);
        let mut diagnostics = Vec::new();

        let light_windows = self.resolve_family(WindowLabel::Light, &self.light, &days, &mut diagnostics)?;
        let night_windows = self.resolve_family(WindowLabel::Night, &self.night, &days, &mut diagnostics)?;

        if let Err(e) = check_disjoint(WindowLabel::Light, &light_windows, WindowLabel::Night, &night_windows) {
            warn!("{}", e);
            diagnostics.push(Diagnostic {
                label: WindowLabel::Night,
                message: e.to_string(),
            });
        }

        let day_spans: Vec<WindowInterval> = days
            .iter()
            .map(|d| WindowInterval {
                begin: d.lower,
                end: d.upper,
            })
            .collect();

        let day = self.build_table(WindowLabel::Day, table, &days, &day_spans, &in_range)?;
        let light = self.build_table(WindowLabel::Light, table, &days, &light_windows, &in_range)?;
        let night = self.build_table(WindowLabel::Night, table, &days, &night_windows, &in_range)?;

        info!(
            days = days.len(),
            subjects = table.subjects().len(),
            samples = in_range.len(),
            diagnostics = diagnostics.len(),
            "aggregated day/light/night totals"
        );

        Ok(DayNightTotals {
            days,
            light_windows,
            night_windows,
            day,
            light,
            night,
            diagnostics,
        })
    }

    /// Resolve a window family; degenerate windows degrade to "no windows"
    fn resolve_family(
        &self,
        label: WindowLabel,
        window: &RecurringWindow,
        days: &[DayBoundary],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<WindowInterval>, ComputeError> {
        match window.resolve(self.calendar.day_start(), days) {
            Ok(windows) => Ok(windows),
            Err(e @ ComputeError::DegenerateWindow { .. }) => {
                warn!(window = label.as_str(), "{}; reporting zero totals", e);
                diagnostics.push(Diagnostic {
                    label,
                    message: e.to_string(),
                });
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// One row per day; row `k` sums the samples inside `spans[k]`
    fn build_table(
        &self,
        label: WindowLabel,
        table: &SampleTable,
        days: &[DayBoundary],
        spans: &[WindowInterval],
        in_range: &Range<usize>,
    ) -> Result<AggregateTable, ComputeError> {
        let width = table.subjects().len();
        let mut rows = Vec::with_capacity(days.len());

        for (k, day) in days.iter().enumerate() {
            let totals = match spans.get(k) {
                Some(span) => {
                    let rows = intersect(&table.index_range(span.begin, span.end), in_range);
                    sum_columns(table, rows)
                }
                None => vec![0.0; width],
            };
            rows.push(AggregateRow {
                day_label: self.calendar.local_midnight(day.lower),
                date: self.calendar.local_date(day.lower)?,
                totals,
            });
        }

        Ok(AggregateTable {
            label,
            subjects: table.subjects().to_vec(),
            rows,
        })
    }
}

fn intersect(a: &Range<usize>, b: &Range<usize>) -> Range<usize> {
    let start = a.start.max(b.start);
    start..a.end.min(b.end).max(start)
}

/// Column sums over a row range
fn sum_columns(table: &SampleTable, rows: Range<usize>) -> Vec<f64> {
    table
        .columns()
        .iter()
        .map(|column| column[rows.clone()].iter().sum())
        .collect()
}
