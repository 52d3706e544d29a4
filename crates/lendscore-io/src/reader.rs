//! CSV loan table reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::LoanDataset;

/// Default name of the label column.
pub const DEFAULT_LABEL_COLUMN: &str = "loan_status";

/// Reads a loan table from a CSV file.
///
/// Expected CSV format:
/// - Header row required
/// - One column holds the label (`loan_status` unless configured), with
///   values `0` or `1` (`0.0` and `1.0` are accepted)
/// - Every other column is a numeric feature
/// - Cells are trimmed of surrounding whitespace
///
/// The reader validates but never repairs: a missing or non-finite cell
/// fails the whole load.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingLabelColumn`] | Header lacks the label column |
/// | [`IoError::NoFeatureColumns`] | Label is the only column |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Feature cell is empty, NaN, Inf, or unparseable |
/// | [`IoError::InvalidLabel`] | Label cell is not 0 or 1 |
pub struct LoanReader {
    path: PathBuf,
    label_column: String,
}

impl LoanReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
        }
    }

    /// Set the name of the label column.
    #[must_use]
    pub fn with_label_column(mut self, label_column: impl Into<String>) -> Self {
        self.label_column = label_column.into();
        self
    }

    /// Read and validate the CSV file, returning a [`LoanDataset`].
    #[instrument(skip(self), fields(path = %self.path.display(), label_column = %self.label_column))]
    pub fn read(&self) -> Result<LoanDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our InconsistentRowLength check fire instead of
        // a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();

        let label_index = header
            .iter()
            .position(|name| name == self.label_column)
            .ok_or_else(|| IoError::MissingLabelColumn {
                path: self.path.clone(),
                column: self.label_column.clone(),
            })?;
        if expected_cols < 2 {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }

        let feature_columns: Vec<usize> = (0..expected_cols).filter(|&c| c != label_index).collect();
        let feature_names: Vec<String> = feature_columns
            .iter()
            .map(|&c| header.get(c).unwrap_or_default().to_string())
            .collect();
        debug!(expected_cols, label_index, "read CSV header");

        let mut features = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let raw_label = record.get(label_index).unwrap_or_default();
            labels.push(self.parse_label(row_index, raw_label)?);

            let mut row = Vec::with_capacity(feature_columns.len());
            for (&col, name) in feature_columns.iter().zip(&feature_names) {
                let raw = record.get(col).unwrap_or_default();
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: name.clone(),
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }
            features.push(row);
        }

        if labels.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let positives = labels.iter().filter(|&&l| l == 1).count();
        info!(
            n_rows = labels.len(),
            n_features = feature_names.len(),
            n_positive = positives,
            n_negative = labels.len() - positives,
            "dataset loaded"
        );

        Ok(LoanDataset::new(
            self.label_column.clone(),
            feature_names,
            features,
            labels,
        ))
    }

    fn parse_label(&self, row_index: usize, raw: &str) -> Result<usize, IoError> {
        match raw.parse::<f64>() {
            Ok(v) if v == 0.0 => Ok(0),
            Ok(v) if v == 1.0 => Ok(1),
            _ => Err(IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw.to_string(),
            }),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_loans() {
        let csv = "fico,int_rate,loan_status\n700,0.11,1\n640,0.15,0\n720,0.09,1\n";
        let f = write_csv(csv);
        let ds = LoanReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.feature_names(), &["fico".to_string(), "int_rate".to_string()]);
        assert_eq!(ds.labels(), &[1, 0, 1]);
        assert!((ds.features()[1][1] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn label_column_anywhere_in_header() {
        let csv = "not_fully_paid,fico\n0,700\n1,650\n";
        let f = write_csv(csv);
        let ds = LoanReader::new(f.path())
            .with_label_column("not_fully_paid")
            .read()
            .unwrap();
        assert_eq!(ds.feature_names(), &["fico".to_string()]);
        assert_eq!(ds.features(), &[vec![700.0], vec![650.0]]);
        assert_eq!(ds.labels(), &[0, 1]);
    }

    #[test]
    fn whitespace_trimmed_and_float_labels_accepted() {
        let csv = "fico , loan_status\n 700 , 1.0\n650,0.0\n";
        let f = write_csv(csv);
        let ds = LoanReader::new(f.path()).read().unwrap();
        assert_eq!(ds.labels(), &[1, 0]);
    }

    #[test]
    fn error_file_not_found() {
        let result = LoanReader::new(Path::new("/nonexistent/loans.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_missing_label_column() {
        let f = write_csv("fico,int_rate\n700,0.1\n");
        let result = LoanReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::MissingLabelColumn { ref column, .. }) if column == "loan_status"
        ));
    }

    #[test]
    fn error_no_feature_columns() {
        let f = write_csv("loan_status\n1\n0\n");
        let result = LoanReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::NoFeatureColumns { .. })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv("fico,loan_status\n");
        let result = LoanReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_csv("fico,int_rate,loan_status\n700,0.1,1\n650,0\n");
        let result = LoanReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn error_missing_feature_value() {
        let f = write_csv("fico,int_rate,loan_status\n700,,1\n");
        let result = LoanReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::NonFiniteValue { ref column, .. }) if column == "int_rate"
        ));
    }

    #[test]
    fn error_non_finite_nan() {
        let f = write_csv("fico,loan_status\nNaN,1\n");
        let result = LoanReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::NonFiniteValue { row_index: 0, .. })));
    }

    #[test]
    fn error_invalid_label() {
        let f = write_csv("fico,loan_status\n700,1\n650,2\n");
        let result = LoanReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InvalidLabel { row_index: 1, ref raw, .. }) if raw == "2"
        ));
    }

    #[test]
    fn error_text_label() {
        let f = write_csv("fico,loan_status\n700,yes\n");
        let result = LoanReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::InvalidLabel { .. })));
    }
}
