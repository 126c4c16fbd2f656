//! Error types for Wheel Flux

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid time range: start {start} is not before end {end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("Degenerate window: from {from_minutes} min equals to {to_minutes} min")]
    DegenerateWindow { from_minutes: u32, to_minutes: u32 },

    #[error("Empty interval [{start}, {stop})")]
    EmptyInterval { start: usize, stop: usize },

    #[error("Window families overlap: {first} [{first_begin}, {first_end}) and {second} [{second_begin}, {second_end})")]
    OverlappingWindows {
        first: String,
        first_begin: i64,
        first_end: i64,
        second: String,
        second_begin: i64,
        second_end: i64,
    },

    #[error("Subject {subject}, day {day_index}, window [{window_begin}, {window_end}): {source}")]
    SubjectFailure {
        subject: String,
        day_index: usize,
        window_begin: i64,
        window_end: i64,
        #[source]
        source: Box<ComputeError>,
    },

    #[error("Failed to parse sample data: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Requested range is outside the data: {0}")]
    RangeOutsideData(String),

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Day index {index} out of range ({count} day boundaries)")]
    DayIndexOutOfRange { index: usize, count: usize },
}

impl ComputeError {
    /// Attach subject/window context to an error raised while processing one work unit
    pub fn in_subject(self, subject: &str, day_index: usize, window_begin: i64, window_end: i64) -> Self {
        ComputeError::SubjectFailure {
            subject: subject.to_string(),
            day_index,
            window_begin,
            window_end,
            source: Box::new(self),
        }
    }

    /// Whether this error is a broken internal invariant rather than bad input
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            ComputeError::EmptyInterval { .. } => true,
            ComputeError::SubjectFailure { source, .. } => source.is_invariant_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_context_wraps_source() {
        let err = ComputeError::EmptyInterval { start: 4, stop: 4 }.in_subject("3", 2, 100, 200);
        let msg = err.to_string();
        assert!(msg.contains("Subject 3"));
        assert!(msg.contains("day 2"));
        assert!(msg.contains("[100, 200)"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_range_error_is_not_invariant_violation() {
        let err = ComputeError::InvalidRange { start: 10, end: 5 };
        assert!(!err.is_invariant_violation());
    }
}
