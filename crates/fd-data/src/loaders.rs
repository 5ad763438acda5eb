use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use fd_types::{DataError, FdResult, Label, LabeledDataset};
use ndarray::Array2;

/// Loads labeled transaction datasets from delimited files.
///
/// The file must carry a header row. Every column except the last is a
/// feature; the last column is the 0/1 label.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    delimiter: u8,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Load a labeled dataset from a CSV file on disk.
    pub fn load_csv_file<P: AsRef<Path>>(&self, file_path: P) -> FdResult<LabeledDataset> {
        let path = file_path.as_ref();
        tracing::info!("Loading labeled dataset from: {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| DataError::LoadingFailed {
            message: format!("Failed to open dataset {}: {}", path.display(), e),
        })?;

        let dataset = self.load_csv_reader(file)?;
        tracing::info!(
            rows = dataset.len(),
            features = dataset.n_features(),
            "Loaded dataset from {}",
            path.display()
        );
        Ok(dataset)
    }

    /// Load a labeled dataset from any reader producing CSV text.
    pub fn load_csv_reader<R: std::io::Read>(&self, reader: R) -> FdResult<LabeledDataset> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV headers: {}", e),
            })?
            .clone();

        if headers.len() < 2 {
            return Err(DataError::InvalidFormat {
                message: format!(
                    "expected at least one feature column and a label column, found {} column(s)",
                    headers.len()
                ),
            }
            .into());
        }
        tracing::debug!("CSV headers: {:?}", headers);

        let width = headers.len();
        let n_features = width - 1;
        let feature_names: Vec<String> = headers
            .iter()
            .take(n_features)
            .map(str::to_string)
            .collect();

        let mut values = Vec::new();
        let mut labels = Vec::new();

        for (index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV record at line {}: {}", index + 2, e),
            })?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(index + 2);

            let label = Self::parse_record(&record, &headers, line, &mut values)?;
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(DataError::Empty {
                message: "no data rows after the header".to_string(),
            }
            .into());
        }

        let features = Array2::from_shape_vec((labels.len(), n_features), values).map_err(|e| {
            DataError::InvalidFormat {
                message: e.to_string(),
            }
        })?;

        LabeledDataset::new(feature_names, features, labels)
    }

    /// Append the record's features to `values` and return its label.
    fn parse_record(
        record: &StringRecord,
        headers: &StringRecord,
        line: usize,
        values: &mut Vec<f64>,
    ) -> FdResult<Label> {
        if record.len() != headers.len() {
            return Err(DataError::RaggedRow {
                line,
                expected: headers.len(),
                found: record.len(),
            }
            .into());
        }

        let label_column = headers.len() - 1;
        for (column, raw) in record.iter().enumerate().take(label_column) {
            values.push(Self::parse_number(raw, &headers[column], line)?);
        }

        let raw_label = &record[label_column];
        let label_value = Self::parse_number(raw_label, &headers[label_column], line)?;
        Label::from_value(label_value).ok_or_else(|| {
            DataError::InvalidLabel {
                line,
                value: raw_label.to_string(),
            }
            .into()
        })
    }

    fn parse_number(raw: &str, column: &str, line: usize) -> FdResult<f64> {
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(DataError::ParseError {
                line,
                column: column.to_string(),
                value: raw.to_string(),
            }
            .into()),
        }
    }
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_types::FdError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load(text: &str) -> FdResult<LabeledDataset> {
        DatasetLoader::new().load_csv_reader(text.as_bytes())
    }

    #[test]
    fn loads_features_and_last_column_label() {
        let dataset = load("Time,V1,Amount,Class\n0,1.5,10.0,\"0\"\n1,-2.0,99.5,\"1\"\n").unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.n_features(), 3);
        assert_eq!(dataset.feature_names(), &["Time", "V1", "Amount"]);
        assert_eq!(dataset.labels(), &[Label::Legitimate, Label::Fraud]);
        assert_eq!(dataset.row(1)[1], -2.0);
    }

    #[test]
    fn accepts_float_labels() {
        let dataset = load("a,label\n1,0.0\n2,1.0\n").unwrap();
        assert_eq!(dataset.class_counts(), [1, 1]);
    }

    #[test]
    fn header_only_file_is_empty() {
        assert!(matches!(
            load("a,b,label\n"),
            Err(FdError::Data(DataError::Empty { .. }))
        ));
    }

    #[test]
    fn label_only_file_is_malformed() {
        assert!(matches!(
            load("label\n0\n1\n"),
            Err(FdError::Data(DataError::InvalidFormat { .. }))
        ));
    }

    #[test]
    fn ragged_rows_report_line_number() {
        match load("a,b,label\n1,2,0\n1,0\n") {
            Err(FdError::Data(DataError::RaggedRow {
                line,
                expected,
                found,
            })) => assert_eq!((line, expected, found), (3, 3, 2)),
            other => panic!("expected ragged row error, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_feature_is_a_parse_error() {
        match load("a,b,label\n1,x,0\n") {
            Err(FdError::Data(DataError::ParseError { column, value, .. })) => {
                assert_eq!(column, "b");
                assert_eq!(value, "x");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn label_outside_zero_one_is_rejected() {
        assert!(matches!(
            load("a,label\n1,2\n"),
            Err(FdError::Data(DataError::InvalidLabel { line: 2, .. }))
        ));
    }

    #[test]
    fn loads_from_file_and_reports_missing_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a;b;label").unwrap();
        writeln!(file, "1;2;0").unwrap();
        writeln!(file, "3;4;1").unwrap();

        let dataset = DatasetLoader::with_delimiter(b';')
            .load_csv_file(file.path())
            .unwrap();
        assert_eq!(dataset.len(), 2);

        let missing = DatasetLoader::new().load_csv_file("/nonexistent/dataset.csv");
        assert!(matches!(
            missing,
            Err(FdError::Data(DataError::LoadingFailed { .. }))
        ));
    }
}
