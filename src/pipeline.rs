//! Pipeline orchestration
//!
//! This module provides the public API for a full analysis run:
//! sample table → day/light/night totals → per-night burst detection →
//! interval kinematics → flat interval table.
//!
//! Interval records come out subject-major, then in night order, then in run
//! order. The parallel path fans subjects out over a rayon pool and collects
//! the per-subject buffers back in subject order, so both paths produce the
//! same table.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bursts::{detect_runs, BurstConfig};
use crate::config::AnalysisConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::histogram::{SpeedHistogramBuilder, WeeklyHistogram};
use crate::kinematics::KinematicsCalculator;
use crate::schema::{SampleFileAdapter, SampleTable};
use crate::types::{DayNightTotals, IntervalRecord, NightSummary, RunInterval, WindowInterval};

/// Everything one run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Analysed range, both ends inclusive
    pub range_start: i64,
    pub range_end: i64,
    pub totals: DayNightTotals,
    pub nights: Vec<NightSummary>,
    pub intervals: Vec<IntervalRecord>,
}

/// Analyse delimited sample text and return the JSON report (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let json = analyze_text(&std::fs::read_to_string("rat.xvg")?, &AnalysisConfig::default())?;
/// ```
pub fn analyze_text(text: &str, config: &AnalysisConfig) -> Result<String, ComputeError> {
    let table = SampleFileAdapter::parse_text(text)?;
    let processor = ActivityProcessor::new(config.clone())?;
    let output = processor.analyze(&table)?;
    ReportEncoder::new().encode_to_json(config, &output)
}

/// Configured analysis runner
#[derive(Debug, Clone)]
pub struct ActivityProcessor {
    config: AnalysisConfig,
}

impl ActivityProcessor {
    pub fn new(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every stage over a table
    pub fn analyze(&self, table: &SampleTable) -> Result<AnalysisOutput, ComputeError> {
        let (range_start, range_end) = self.config.resolve_range(table)?;
        let table = table.crop(range_start, range_end)?;
        if let Some(cadence) = cadence_mismatch(&table, self.config.sample_period_secs) {
            warn!(
                cadence_secs = cadence,
                sample_period_secs = self.config.sample_period_secs,
                "data cadence differs from the configured sample period; kinematics use the configured period"
            );
        }

        // Stage 1-3: day boundaries, windows, totals
        let totals = self.config.aggregator()?.aggregate(&table, range_start, range_end)?;

        // Stage 4-6: bursts and kinematics per subject and night
        let kinematics = self.config.kinematics();
        let bursts = self.config.burst_config();
        let intervals = extract_intervals(
            &table,
            &totals.night_windows,
            &bursts,
            &kinematics,
            self.config.parallel,
        )?;
        let nights = summarize_nights(&table, &totals.night_windows, &kinematics);

        info!(
            subjects = table.subjects().len(),
            nights = totals.night_windows.len(),
            intervals = intervals.len(),
            "analysis complete"
        );

        Ok(AnalysisOutput {
            range_start,
            range_end,
            totals,
            nights,
            intervals,
        })
    }
}

impl ActivityProcessor {
    /// Weekly night-time speed densities per subject
    pub fn speed_histograms(&self, table: &SampleTable) -> Result<Vec<WeeklyHistogram>, ComputeError> {
        let (range_start, range_end) = self.config.resolve_range(table)?;
        let table = table.crop(range_start, range_end)?;
        let days = self
            .config
            .calendar()?
            .day_boundaries(range_start, range_end.saturating_add(1))?;
        let nights = self.config.night.resolve(self.config.day_start, &days)?;
        Ok(SpeedHistogramBuilder::new(self.config.kinematics()).build(&table, &nights))
    }
}

/// Nominal step of the table when it disagrees with `sample_period_secs`
fn cadence_mismatch(table: &SampleTable, sample_period_secs: f64) -> Option<i64> {
    table
        .nominal_cadence()
        .filter(|&step| (step as f64 - sample_period_secs).abs() > f64::EPSILON)
}

/// `[first, last]` sample span as a half-open window
pub(crate) fn data_bounds(table: &SampleTable) -> Option<(i64, i64)> {
    Some((table.first_timestamp()?, table.last_timestamp()? + 1))
}

/// Interval records for every subject and every night window
pub fn extract_intervals(
    table: &SampleTable,
    night_windows: &[WindowInterval],
    bursts: &BurstConfig,
    kinematics: &KinematicsCalculator,
    parallel: bool,
) -> Result<Vec<IntervalRecord>, ComputeError> {
    let subjects = 0..table.subjects().len();
    let per_subject: Vec<Vec<IntervalRecord>> = if parallel {
        subjects
            .into_par_iter()
            .map(|i| extract_subject(table, i, night_windows, bursts, kinematics))
            .collect::<Result<_, _>>()?
    } else {
        subjects
            .map(|i| extract_subject(table, i, night_windows, bursts, kinematics))
            .collect::<Result<_, _>>()?
    };
    Ok(per_subject.into_iter().flatten().collect())
}

/// Runs for one subject column, in night order
fn extract_subject(
    table: &SampleTable,
    column: usize,
    night_windows: &[WindowInterval],
    bursts: &BurstConfig,
    kinematics: &KinematicsCalculator,
) -> Result<Vec<IntervalRecord>, ComputeError> {
    let subject = &table.subjects()[column];
    let values = &table.columns()[column];
    let mut records = Vec::new();
    let Some((data_start, data_end)) = data_bounds(table) else {
        return Ok(records);
    };

    info!(subject = %subject, "extracting intervals");
    for (day_index, window) in night_windows.iter().enumerate() {
        let Some(night) = window.clip(data_start, data_end) else {
            debug!(subject = %subject, day_index, "night outside data, skipped");
            continue;
        };
        let rows = table.index_range(night.begin, night.end);
        let trace = &values[rows];

        for span in detect_runs(trace, bursts) {
            let run = RunInterval {
                subject: subject.clone(),
                day_index,
                start: span.start,
                stop: span.end,
            };
            let stats = kinematics
                .compute(trace, run.start..run.stop, run.day_index)
                .map_err(|e| e.in_subject(subject, day_index, night.begin, night.end))?;
            records.push(IntervalRecord::new(run.subject, stats));
        }
        debug!(subject = %subject, day_index, samples = trace.len(), total = records.len(), "night scanned");
    }

    Ok(records)
}

/// Per-night clipped bounds, duration and distance per subject
pub fn summarize_nights(
    table: &SampleTable,
    night_windows: &[WindowInterval],
    kinematics: &KinematicsCalculator,
) -> Vec<NightSummary> {
    let bounds = data_bounds(table);
    night_windows
        .iter()
        .enumerate()
        .map(|(day_index, window)| {
            let clipped = bounds.and_then(|(lo, hi)| window.clip(lo, hi));
            match clipped {
                Some(night) => {
                    let rows = table.index_range(night.begin, night.end);
                    let distances = table
                        .columns()
                        .iter()
                        .map(|c| c[rows.clone()].iter().sum::<f64>() * kinematics.unit_conversion())
                        .collect();
                    NightSummary {
                        day_index,
                        window: night,
                        duration: format_hours_minutes(night.duration_secs()),
                        distances,
                    }
                }
                None => NightSummary {
                    day_index,
                    window: *window,
                    duration: format_hours_minutes(0),
                    distances: vec![0.0; table.subjects().len()],
                },
            }
        })
        .collect()
}

/// "HH:MM" for a duration in seconds
pub fn format_hours_minutes(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}", secs / 3600, (secs % 3600) / 60)
}
