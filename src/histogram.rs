//! Weekly speed histograms
//!
//! Night-window samples of one subject are pooled per training week, turned
//! into speeds and binned over fixed edges `k × speed unit` (k = 2..=19),
//! normalised as a probability density.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kinematics::KinematicsCalculator;
use crate::pipeline::data_bounds;
use crate::schema::SampleTable;
use crate::types::{SubjectId, WindowInterval};

/// Lowest and highest edge multiplier
const FIRST_EDGE: u32 = 2;
const LAST_EDGE: u32 = 19;

/// Days pooled into one training week
const DAYS_PER_WEEK: usize = 7;

/// Densities for one training week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekDensity {
    /// 1-based training week
    pub week: u32,
    pub samples: usize,
    /// One value per bin (edges.len() - 1)
    pub densities: Vec<f64>,
}

/// Weekly histograms for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyHistogram {
    pub subject: SubjectId,
    pub edges: Vec<f64>,
    pub weeks: Vec<WeekDensity>,
}

impl WeeklyHistogram {
    /// Plain-text layout: the edges on one line, then one line of densities per week
    pub fn to_data_text(&self) -> String {
        let mut out: String = self.edges.iter().map(|e| format!("{:<6.1}  ", e)).collect();
        out.push('\n');
        for week in &self.weeks {
            let line: String = week.densities.iter().map(|d| format!("{:<8.5}", d)).collect();
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

/// Builds weekly histograms from night windows
#[derive(Debug, Clone, Copy)]
pub struct SpeedHistogramBuilder {
    kinematics: KinematicsCalculator,
}

impl SpeedHistogramBuilder {
    pub fn new(kinematics: KinematicsCalculator) -> Self {
        Self { kinematics }
    }

    /// Fixed bin edges in speed units
    pub fn edges(&self) -> Vec<f64> {
        (FIRST_EDGE..=LAST_EDGE)
            .map(|k| self.kinematics.speed_per_minute(k as f64))
            .collect()
    }

    /// One histogram per subject, in table column order
    pub fn build(&self, table: &SampleTable, night_windows: &[WindowInterval]) -> Vec<WeeklyHistogram> {
        let edges = self.edges();
        let bounds = data_bounds(table);

        // row ranges of each night, grouped by week
        let mut weeks: Vec<Vec<std::ops::Range<usize>>> = Vec::new();
        for (day_index, window) in night_windows.iter().enumerate() {
            if day_index % DAYS_PER_WEEK == 0 {
                weeks.push(Vec::new());
            }
            let clipped = bounds.and_then(|(lo, hi)| window.clip(lo, hi));
            if let (Some(night), Some(week)) = (clipped, weeks.last_mut()) {
                week.push(table.index_range(night.begin, night.end));
            }
        }
        debug!(weeks = weeks.len(), bins = edges.len() - 1, "histogram layout");

        table
            .subjects()
            .iter()
            .zip(table.columns())
            .map(|(subject, column)| {
                let weeks = weeks
                    .iter()
                    .enumerate()
                    .map(|(w, rows)| {
                        let speeds: Vec<f64> = rows
                            .iter()
                            .flat_map(|r| column[r.clone()].iter())
                            .map(|&v| self.kinematics.speed_per_minute(v))
                            .collect();
                        WeekDensity {
                            week: w as u32 + 1,
                            samples: speeds.len(),
                            densities: density(&speeds, &edges),
                        }
                    })
                    .collect();
                WeeklyHistogram {
                    subject: subject.clone(),
                    edges: edges.clone(),
                    weeks,
                }
            })
            .collect()
    }
}

/// Probability-density histogram over `edges`.
///
/// Bins are half-open except the last, which also takes its right edge.
/// Values outside the edges are ignored. No counted value gives all zeros.
pub fn density(values: &[f64], edges: &[f64]) -> Vec<f64> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let bins = edges.len() - 1;
    let (lo, hi) = (edges[0], edges[bins]);

    let mut counts = vec![0usize; bins];
    for &v in values {
        if v < lo || v > hi {
            continue;
        }
        let bin = (edges.partition_point(|e| *e <= v) - 1).min(bins - 1);
        counts[bin] += 1;
    }

    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0.0; bins];
    }
    counts
        .iter()
        .zip(edges.windows(2))
        .map(|(&c, w)| c as f64 / (total as f64 * (w[1] - w[0])))
        .collect()
}
