//! Report encoding
//!
//! This module encodes a finished analysis into a self-describing JSON report.
//! Every report carries the producer identity, the time it was computed and
//! the configuration that produced it, so a result file can be traced back to
//! its run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::error::ComputeError;
use crate::pipeline::AnalysisOutput;
use crate::types::{AggregateTable, DayBoundary, Diagnostic, IntervalRecord, NightSummary};
use crate::{PRODUCER_NAME, VERSION};

/// Current report layout version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Time span and computation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub range_start_utc: String,
    pub range_end_utc: String,
    pub computed_at_utc: String,
}

/// Day/light/night totals as written to the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAggregates {
    pub days: Vec<DayBoundary>,
    pub day: AggregateTable,
    pub light: AggregateTable,
    pub night: AggregateTable,
}

/// Complete JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub config: AnalysisConfig,
    pub aggregates: ReportAggregates,
    pub nights: Vec<NightSummary>,
    pub intervals: Vec<IntervalRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, config: &AnalysisConfig, output: &AnalysisOutput) -> AnalysisReport {
        let computed_at = Utc::now();

        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            range_start_utc: rfc3339(output.range_start),
            range_end_utc: rfc3339(output.range_end),
            computed_at_utc: computed_at.to_rfc3339(),
        };

        let totals = &output.totals;
        AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            config: config.clone(),
            aggregates: ReportAggregates {
                days: totals.days.clone(),
                day: totals.day.clone(),
                light: totals.light.clone(),
                night: totals.night.clone(),
            },
            nights: output.nights.clone(),
            intervals: output.intervals.clone(),
            diagnostics: totals.diagnostics.clone(),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        config: &AnalysisConfig,
        output: &AnalysisOutput,
    ) -> Result<String, ComputeError> {
        let report = self.encode(config, output);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}

/// Epoch seconds as RFC 3339; out-of-range values fall back to the raw number
fn rfc3339(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ActivityProcessor;
    use crate::schema::SampleTable;

    fn make_output(config: &AnalysisConfig) -> AnalysisOutput {
        // one hour of 5 s samples from 2024-01-15 20:00 UTC, a burst at 21:00
        let start = 1_705_348_800;
        let timestamps: Vec<i64> = (0..720).map(|i| start + i * 5).collect();
        let mut values = vec![0.0; 720];
        for v in values.iter_mut().skip(700).take(5) {
            *v = 1.0;
        }
        let table = SampleTable::from_columns(timestamps, vec![values]).unwrap();
        ActivityProcessor::new(config.clone()).unwrap().analyze(&table).unwrap()
    }

    #[test]
    fn test_encode_report() {
        let config = AnalysisConfig::default();
        let output = make_output(&config);
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&config, &output);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.provenance.range_start_utc, "2024-01-15T20:00:00+00:00");
        assert_eq!(report.config, config);
        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.aggregates.night.rows.len(), report.aggregates.days.len());
        assert_eq!(report.nights.len(), 1);
    }

    #[test]
    fn test_encode_to_json() {
        let config = AnalysisConfig::default();
        let output = make_output(&config);
        let json = ReportEncoder::new().encode_to_json(&config, &output).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("report_version").is_some());
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("provenance").is_some());
        assert!(parsed.get("aggregates").is_some());
        assert!(parsed.get("diagnostics").is_some());
        assert_eq!(parsed["config"]["night"]["from"], "20:53");
        assert_eq!(parsed["intervals"][0]["subject_id"], "1");
    }

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(ReportEncoder::new().instance_id, ReportEncoder::new().instance_id);
    }
}
