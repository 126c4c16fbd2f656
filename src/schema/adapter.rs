//! Adapter for reading whitespace-delimited sample files
//!
//! Input layout: one row per sample, first column the epoch-second timestamp,
//! remaining columns one activity count per subject. `#` starts a comment
//! (whole line or trailing), blank lines are skipped.

use crate::error::ComputeError;
use crate::schema::sample_table::SampleTable;

/// Adapter for converting delimited text into a [`SampleTable`]
pub struct SampleFileAdapter;

impl SampleFileAdapter {
    /// Parse delimited text; subjects are named by 1-based column number
    pub fn parse_text(text: &str) -> Result<SampleTable, ComputeError> {
        let mut timestamps = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();
        let mut width: Option<usize> = None;

        for (line_num, line) in text.lines().enumerate() {
            let content = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            };
            let mut fields = content.split_whitespace();
            let Some(first) = fields.next() else {
                continue;
            };

            let ts = parse_timestamp(first).map_err(|e| {
                ComputeError::ParseError(format!("line {}: {}", line_num + 1, e))
            })?;

            let values = fields
                .map(|f| {
                    f.parse::<f64>().map_err(|_| {
                        ComputeError::ParseError(format!(
                            "line {}: bad value {:?}",
                            line_num + 1,
                            f
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, ComputeError>>()?;

            match width {
                None => {
                    if values.is_empty() {
                        return Err(ComputeError::ParseError(format!(
                            "line {}: no subject columns",
                            line_num + 1
                        )));
                    }
                    width = Some(values.len());
                    columns = vec![Vec::new(); values.len()];
                }
                Some(w) if w != values.len() => {
                    return Err(ComputeError::ParseError(format!(
                        "line {}: expected {} value columns, found {}",
                        line_num + 1,
                        w,
                        values.len()
                    )));
                }
                Some(_) => {}
            }

            if let Some(&prev) = timestamps.last() {
                if ts <= prev {
                    return Err(ComputeError::ParseError(format!(
                        "line {}: timestamp {} does not follow {}",
                        line_num + 1,
                        ts,
                        prev
                    )));
                }
            }

            timestamps.push(ts);
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }

        if timestamps.is_empty() {
            return Err(ComputeError::ParseError("no samples found".to_string()));
        }

        SampleTable::from_columns(timestamps, columns)
    }

    /// Summarize a table for validation reports
    pub fn describe(table: &SampleTable) -> TableSummary {
        TableSummary {
            rows: table.len(),
            subjects: table.subjects().to_vec(),
            first_timestamp: table.first_timestamp(),
            last_timestamp: table.last_timestamp(),
            cadence_secs: table.nominal_cadence(),
        }
    }
}

/// Shape of a parsed sample table
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub subjects: Vec<String>,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub cadence_secs: Option<i64>,
}

/// Integer seconds, or a decimal that rounds to them
fn parse_timestamp(field: &str) -> Result<i64, String> {
    if let Ok(ts) = field.parse::<i64>() {
        return Ok(ts);
    }
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v.round() as i64),
        _ => Err(format!("bad timestamp {:?}", field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_text_with_comments() {
        let text = "# rat wheel counts\n\
                    1000 0 1\n\
                    \n\
                    1005 2.5 0   # trailing note\n\
                    1010.0 0 3\n";
        let table = SampleFileAdapter::parse_text(text).unwrap();

        assert_eq!(table.timestamps(), &[1000, 1005, 1010]);
        assert_eq!(table.subjects(), &["1".to_string(), "2".to_string()]);
        assert_eq!(table.column("1").unwrap(), &[0.0, 2.5, 0.0]);
        assert_eq!(table.column("2").unwrap(), &[1.0, 0.0, 3.0]);
    }

    #[test]
    fn test_parse_text_ragged_row_fails() {
        let text = "1000 0 1\n1005 2\n";
        let err = SampleFileAdapter::parse_text(text).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_text_bad_value_fails() {
        let text = "1000 0 x\n";
        assert!(SampleFileAdapter::parse_text(text).is_err());
    }

    #[test]
    fn test_parse_text_decreasing_timestamp_fails() {
        let text = "1000 0\n995 1\n";
        let err = SampleFileAdapter::parse_text(text).unwrap_err();
        assert!(err.to_string().contains("does not follow"));
    }

    #[test]
    fn test_parse_text_empty_fails() {
        assert!(SampleFileAdapter::parse_text("# nothing\n\n").is_err());
    }

    #[test]
    fn test_describe() {
        let table = SampleFileAdapter::parse_text("0 1\n5 1\n10 1\n").unwrap();
        let summary = SampleFileAdapter::describe(&table);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.first_timestamp, Some(0));
        assert_eq!(summary.last_timestamp, Some(10));
        assert_eq!(summary.cadence_secs, Some(5));
    }
}
