//! Sample table definition
//!
//! A fully materialized, time-indexed table of per-subject activity counts.
//! Timestamps are epoch seconds, strictly increasing; one numeric column per
//! subject. The table is immutable once built and borrowed read-only by every
//! pipeline stage.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::ComputeError;
use crate::types::SubjectId;

/// Time-indexed activity counts, column-major (one column per subject)
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    timestamps: Vec<i64>,
    subjects: Vec<SubjectId>,
    columns: Vec<Vec<f64>>,
}

impl SampleTable {
    /// Build a table, validating shape, ordering and finiteness
    pub fn new(
        timestamps: Vec<i64>,
        subjects: Vec<SubjectId>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, ComputeError> {
        let table = Self {
            timestamps,
            subjects,
            columns,
        };
        table.validate().map_err(|e| ComputeError::ParseError(e.to_string()))?;
        Ok(table)
    }

    /// Build a table whose subjects are named by 1-based column number
    pub fn from_columns(timestamps: Vec<i64>, columns: Vec<Vec<f64>>) -> Result<Self, ComputeError> {
        let subjects = (1..=columns.len()).map(|i| i.to_string()).collect();
        Self::new(timestamps, subjects, columns)
    }

    /// Check the table invariants
    pub fn validate(&self) -> Result<(), TableValidationError> {
        if self.subjects.len() != self.columns.len() {
            return Err(TableValidationError::SubjectCountMismatch {
                subjects: self.subjects.len(),
                columns: self.columns.len(),
            });
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, s) in self.subjects.iter().enumerate() {
            if let Some(first) = seen.insert(s.as_str(), i) {
                return Err(TableValidationError::DuplicateSubject {
                    subject: s.clone(),
                    first,
                    second: i,
                });
            }
        }

        for (subject, column) in self.subjects.iter().zip(&self.columns) {
            if column.len() != self.timestamps.len() {
                return Err(TableValidationError::ColumnLengthMismatch {
                    subject: subject.clone(),
                    expected: self.timestamps.len(),
                    actual: column.len(),
                });
            }
            if let Some(row) = column.iter().position(|v| !v.is_finite()) {
                return Err(TableValidationError::NonFiniteValue {
                    subject: subject.clone(),
                    row,
                });
            }
        }

        if let Some(row) = self.timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(TableValidationError::NonMonotonicIndex {
                row: row + 1,
                previous: self.timestamps[row],
                current: self.timestamps[row + 1],
            });
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn subjects(&self) -> &[SubjectId] {
        &self.subjects
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.timestamps.last().copied()
    }

    /// Column for a subject id
    pub fn column(&self, subject: &str) -> Result<&[f64], ComputeError> {
        self.subjects
            .iter()
            .position(|s| s == subject)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| ComputeError::UnknownSubject(subject.to_string()))
    }

    /// Row indices whose timestamps fall in `[begin, end)` (binary search)
    pub fn index_range(&self, begin: i64, end: i64) -> Range<usize> {
        let lo = self.timestamps.partition_point(|&t| t < begin);
        let hi = self.timestamps.partition_point(|&t| t < end).max(lo);
        lo..hi
    }

    /// Sub-table for `[start, stop]` (both ends inclusive).
    ///
    /// Fails when the requested start precedes the first sample or when no
    /// sample survives the crop.
    pub fn crop(&self, start: i64, stop: i64) -> Result<SampleTable, ComputeError> {
        if start > stop {
            return Err(ComputeError::InvalidRange { start, end: stop });
        }
        let first = self
            .first_timestamp()
            .ok_or_else(|| ComputeError::RangeOutsideData("table is empty".to_string()))?;
        if first > start {
            return Err(ComputeError::RangeOutsideData(format!(
                "data starts at {} but range requested from {}",
                first, start
            )));
        }

        let rows = self.index_range(start, stop.saturating_add(1));
        if rows.is_empty() {
            return Err(ComputeError::RangeOutsideData(format!(
                "no samples in [{}, {}]",
                start, stop
            )));
        }

        Ok(SampleTable {
            timestamps: self.timestamps[rows.clone()].to_vec(),
            subjects: self.subjects.clone(),
            columns: self.columns.iter().map(|c| c[rows.clone()].to_vec()).collect(),
        })
    }

    /// Keep only the listed subjects, in the listed order
    pub fn select_subjects(&self, ids: &[&str]) -> Result<SampleTable, ComputeError> {
        let mut subjects = Vec::with_capacity(ids.len());
        let mut columns = Vec::with_capacity(ids.len());
        for id in ids {
            columns.push(self.column(id)?.to_vec());
            subjects.push(id.to_string());
        }
        SampleTable::new(self.timestamps.clone(), subjects, columns)
    }

    /// Replace the subject names
    pub fn with_subject_names(self, names: Vec<SubjectId>) -> Result<SampleTable, ComputeError> {
        SampleTable::new(self.timestamps, names, self.columns)
    }

    /// Most common step between consecutive timestamps (ties go to the smaller step)
    pub fn nominal_cadence(&self) -> Option<i64> {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for w in self.timestamps.windows(2) {
            *counts.entry(w[1] - w[0]).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by(|(step_a, n_a), (step_b, n_b)| n_a.cmp(n_b).then(step_b.cmp(step_a)))
            .map(|(step, _)| step)
    }
}

/// Sample table validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableValidationError {
    #[error("{subjects} subject names for {columns} columns")]
    SubjectCountMismatch { subjects: usize, columns: usize },

    #[error("Subject {subject} appears twice (columns {first} and {second})")]
    DuplicateSubject {
        subject: String,
        first: usize,
        second: usize,
    },

    #[error("Column {subject} has {actual} values, expected {expected}")]
    ColumnLengthMismatch {
        subject: String,
        expected: usize,
        actual: usize,
    },

    #[error("Column {subject} has a non-finite value at row {row}")]
    NonFiniteValue { subject: String, row: usize },

    #[error("Timestamp at row {row} ({current}) does not follow {previous}")]
    NonMonotonicIndex {
        row: usize,
        previous: i64,
        current: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_table() -> SampleTable {
        SampleTable::from_columns(
            vec![0, 5, 10, 15, 20],
            vec![vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![0.0, 0.0, 1.0, 0.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_subjects_default_to_column_numbers() {
        let table = make_table();
        assert_eq!(table.subjects(), &["1".to_string(), "2".to_string()]);
        assert_eq!(table.column("2").unwrap(), &[0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rejects_non_monotonic_index() {
        let result = SampleTable::from_columns(vec![0, 5, 5], vec![vec![1.0, 1.0, 1.0]]);
        assert!(matches!(result, Err(ComputeError::ParseError(_))));
    }

    #[test]
    fn test_rejects_nan() {
        let result = SampleTable::from_columns(vec![0, 5], vec![vec![1.0, f64::NAN]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let result = SampleTable::from_columns(vec![0, 5], vec![vec![1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_index_range_half_open() {
        let table = make_table();
        assert_eq!(table.index_range(5, 15), 1..3);
        assert_eq!(table.index_range(4, 16), 1..4);
        assert_eq!(table.index_range(100, 200), 5..5);
        assert_eq!(table.index_range(15, 5), 3..3);
    }

    #[test]
    fn test_crop_inclusive() {
        let table = make_table();
        let cropped = table.crop(5, 15).unwrap();
        assert_eq!(cropped.timestamps(), &[5, 10, 15]);
        assert_eq!(cropped.column("1").unwrap(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_crop_before_data_fails() {
        let table = make_table();
        let result = table.crop(-10, 15);
        assert!(matches!(result, Err(ComputeError::RangeOutsideData(_))));
    }

    #[test]
    fn test_select_subjects_reorders() {
        let table = make_table();
        let selected = table.select_subjects(&["2", "1"]).unwrap();
        assert_eq!(selected.subjects(), &["2".to_string(), "1".to_string()]);
        assert!(table.select_subjects(&["7"]).is_err());
    }

    #[test]
    fn test_with_subject_names() {
        let named = make_table()
            .with_subject_names(vec!["rat-a".to_string(), "rat-b".to_string()])
            .unwrap();
        assert_eq!(named.subjects(), &["rat-a".to_string(), "rat-b".to_string()]);
        assert_eq!(named.column("rat-b").unwrap(), &[0.0, 0.0, 1.0, 0.0, 0.0]);

        assert!(make_table().with_subject_names(vec!["only-one".to_string()]).is_err());
        assert!(make_table()
            .with_subject_names(vec!["x".to_string(), "x".to_string()])
            .is_err());
    }

    #[test]
    fn test_nominal_cadence() {
        let table = SampleTable::from_columns(vec![0, 5, 10, 15, 30], vec![vec![0.0; 5]]).unwrap();
        assert_eq!(table.nominal_cadence(), Some(5));

        let single = SampleTable::from_columns(vec![0], vec![vec![0.0]]).unwrap();
        assert_eq!(single.nominal_cadence(), None);
    }
}
