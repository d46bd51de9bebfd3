//! CSV table reader with missing-value tokens and per-column type inference.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::table::{Column, Table};

/// Tokens treated as missing when no other set is configured.
pub const DEFAULT_MISSING_TOKENS: [&str; 4] = ["?", "NA", "N/A", ""];

/// Reads delimited text into a [`Table`].
///
/// Expected format:
/// - Header row required; column names must be unique
/// - Every data row has the same number of fields as the header
/// - Fields exactly matching a missing token become the missing marker
///
/// A column is numeric when every non-missing field parses as a finite
/// number, otherwise categorical. A column with no non-missing fields is numeric.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyHeader`] | No header row, or a header with zero fields |
/// | [`IoError::DuplicateColumn`] | Two header fields are identical |
/// | [`IoError::InconsistentRowLength`] | Row has a different field count than the header |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
#[derive(Debug, Clone)]
pub struct TableReader {
    missing_tokens: HashSet<String>,
    delimiter: u8,
}

impl TableReader {
    /// Create a reader using [`DEFAULT_MISSING_TOKENS`] and a comma delimiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            missing_tokens: DEFAULT_MISSING_TOKENS.iter().map(|t| (*t).to_string()).collect(),
            delimiter: b',',
        }
    }

    /// Replace the set of missing-value tokens.
    #[must_use]
    pub fn with_missing_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Return `true` if `field` is one of the configured missing tokens.
    #[must_use]
    pub fn is_missing_token(&self, field: &str) -> bool {
        self.missing_tokens.contains(field)
    }

    /// Read a table from a file.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn read_path(&self, path: &Path) -> Result<Table, IoError> {
        let file = std::fs::File::open(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.read(file, &path.display().to_string())
    }

    /// Read a table from any byte stream. `origin` labels the stream in errors.
    #[instrument(skip(self, input))]
    pub fn read<R: Read>(&self, input: R, origin: &str) -> Result<Table, IoError> {
        // flexible(true) so our InconsistentRowLength check fires instead of a
        // low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(input);

        let csv_error = |e: csv::Error| IoError::CsvParse {
            origin: origin.to_string(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        };

        let header: Vec<String> = rdr
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        if header.is_empty() || (header.len() == 1 && header[0].is_empty()) {
            return Err(IoError::EmptyHeader {
                origin: origin.to_string(),
            });
        }
        let expected = header.len();
        debug!(expected, "read CSV header");

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); expected];
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(csv_error)?;
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    origin: origin.to_string(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            for (cells, field) in raw.iter_mut().zip(record.iter()) {
                cells.push((!self.is_missing_token(field)).then(|| field.to_string()));
            }
        }

        let n_rows = raw.first().map_or(0, Vec::len);
        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                origin: origin.to_string(),
            });
        }

        let columns: Vec<Column> = header
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| infer_column(name, cells))
            .collect();
        let table = Table::new(columns)?;

        info!(
            n_rows = table.n_rows(),
            n_columns = table.n_columns(),
            n_missing = table.missing_count(),
            "table loaded"
        );
        Ok(table)
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric if every present cell parses as a finite number, else categorical.
fn infer_column(name: String, cells: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => parse_number(s).map(Some),
        })
        .collect();
    match parsed {
        Some(values) => Column::numeric(name, values),
        None => Column::categorical(name, cells),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnKind, Value};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn read_str(csv: &str) -> Result<Table, IoError> {
        TableReader::new().read(csv.as_bytes(), "<test>")
    }

    #[test]
    fn infers_numeric_and_categorical() {
        let t = read_str("id,Gender,Age,CGPA\n1,Male,33,8.97\n2,Female,24,5.9\n").unwrap();
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.column("id").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(t.column("Gender").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(t.column("CGPA").unwrap().value(1), Value::Number(5.9));
    }

    #[test]
    fn default_tokens_become_missing() {
        let t = read_str("a,b\n?,x\nNA,N/A\n,y\n4,z\n").unwrap();
        let a = t.column("a").unwrap();
        assert_eq!(a.kind(), ColumnKind::Numeric);
        assert_eq!(a.missing_count(), 3);
        assert_eq!(t.column("b").unwrap().missing_count(), 1);
    }

    #[test]
    fn question_mark_does_not_force_categorical() {
        let t = read_str("Financial Stress\n1.0\n?\n5.0\n").unwrap();
        let col = t.column("Financial Stress").unwrap();
        assert_eq!(col.kind(), ColumnKind::Numeric);
        assert!(col.is_missing(1));
    }

    #[test]
    fn custom_tokens_replace_defaults() {
        let t = TableReader::new()
            .with_missing_tokens(["-"])
            .read("a\n-\n?\n".as_bytes(), "<test>")
            .unwrap();
        let a = t.column("a").unwrap();
        assert_eq!(a.kind(), ColumnKind::Categorical);
        assert_eq!(a.value(1), Value::Text("?"));
        assert!(a.is_missing(0));
    }

    #[test]
    fn all_missing_column_is_numeric() {
        let t = read_str("a,b\n?,1\n?,2\n").unwrap();
        assert_eq!(t.column("a").unwrap().kind(), ColumnKind::Numeric);
    }

    #[test]
    fn non_finite_text_is_categorical() {
        let t = read_str("a\n1\ninf\n").unwrap();
        assert_eq!(t.column("a").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn quoted_fields_keep_inner_text() {
        let t = read_str("Sleep Duration\n'5-6 hours'\n\"7-8 hours\"\n").unwrap();
        let col = t.column("Sleep Duration").unwrap();
        assert_eq!(col.value(0), Value::Text("'5-6 hours'"));
        assert_eq!(col.value(1), Value::Text("7-8 hours"));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let err = read_str("a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength { row_index: 1, expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn error_empty_dataset() {
        let err = read_str("a,b\n").unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn error_empty_header() {
        let err = read_str("").unwrap_err();
        assert!(matches!(err, IoError::EmptyHeader { .. }));
    }

    #[test]
    fn error_duplicate_column() {
        let err = read_str("a,a\n1,2\n").unwrap_err();
        assert!(matches!(err, IoError::DuplicateColumn { .. }));
    }

    #[test]
    fn error_invalid_utf8() {
        let bytes: &[u8] = b"a,b\n1,\xff\xfe\n";
        let err = TableReader::new().read(bytes, "<bytes>").unwrap_err();
        assert!(matches!(err, IoError::CsvParse { .. }));
    }

    #[test]
    fn read_path_and_file_not_found() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"x,y\n1,a\n").unwrap();
        f.flush().unwrap();
        let t = TableReader::new().read_path(f.path()).unwrap();
        assert_eq!(t.n_rows(), 1);

        let err = TableReader::new()
            .read_path(Path::new("/nonexistent/survey.csv"))
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
