//! I/O error types for depscope-io.

use std::path::PathBuf;

/// Errors from table construction, CSV parsing, and artifact writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {origin} at byte offset {offset}")]
    CsvParse {
        /// Where the data came from (a path or a stream label).
        origin: String,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the header row is missing or has no columns.
    #[error("missing or empty header row in {origin}")]
    EmptyHeader {
        /// Where the data came from.
        origin: String,
    },

    /// Returned when the input contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {origin}")]
    EmptyDataset {
        /// Where the data came from.
        origin: String,
    },

    /// Returned when a data row has a different number of fields than the header.
    #[error("inconsistent row length in {origin}: row {row_index} has {got} fields, expected {expected}")]
    InconsistentRowLength {
        /// Where the data came from.
        origin: String,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of fields (from header).
        expected: usize,
        /// Actual number of fields in this row.
        got: usize,
    },

    /// Returned when two columns share a name.
    #[error("duplicate column name \"{name}\"")]
    DuplicateColumn {
        /// The repeated column name.
        name: String,
    },

    /// Returned when a column's length differs from the table's row count.
    #[error("column \"{column}\" has {got} rows, expected {expected}")]
    ColumnLengthMismatch {
        /// The offending column.
        column: String,
        /// Row count shared by the other columns.
        expected: usize,
        /// Row count of the offending column.
        got: usize,
    },

    /// Returned when a named column does not exist in the table.
    #[error("column \"{name}\" not found")]
    ColumnNotFound {
        /// The requested column name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV encoder fails while exporting a table.
    #[error("cannot write CSV to {path}")]
    CsvWrite {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a JSON artifact cannot be serialized.
    #[error("cannot serialize JSON artifact {path}")]
    Serialize {
        /// Path the artifact was destined for.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },
}
