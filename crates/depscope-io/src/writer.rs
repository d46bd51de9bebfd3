//! Artifact writers: processed tables as CSV, reports as JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::table::Table;

/// Relative path of the processed-table export.
pub const PROCESSED_TABLE_PATH: &str = "data/processed_dataset.csv";
/// Relative path of the trained-model archive.
pub const MODEL_PATH: &str = "model/random_forest_model.bin";
/// Relative path of the evaluation report.
pub const EVALUATION_PATH: &str = "evaluation.json";
/// Relative path of the scoring output.
pub const PREDICTIONS_PATH: &str = "predictions.json";

/// Write `table` as comma-delimited text with a header row.
///
/// Missing markers are written as empty fields; numbers use the shortest
/// representation that round-trips (`4.0` is written as `4`).
///
/// # Errors
///
/// Returns the underlying [`csv::Error`] on encoding or write failure.
pub fn write_csv<W: Write>(table: &Table, output: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(output);
    wtr.write_record(table.column_names())?;
    for row in 0..table.n_rows() {
        wtr.write_record(table.row(row).iter().map(ToString::to_string))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes pipeline artifacts under a fixed root directory.
///
/// Creates the root directory on construction if it does not exist; nested
/// directories (`data/`, `model/`) are created on first write.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    /// Create a writer rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn new(root: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(root).map_err(|e| IoError::OutputDirCreate {
            path: root.to_path_buf(),
            source: e,
        })?;
        debug!("artifact root ready");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Return the artifact root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` under the root and create its parent directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the parent cannot be created.
    pub fn prepare(&self, relative: &str) -> Result<PathBuf, IoError> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| IoError::OutputDirCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        Ok(path)
    }

    /// Write the processed table to [`PROCESSED_TABLE_PATH`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::OutputDirCreate`] | `data/` cannot be created |
    /// | [`IoError::WriteFile`] | The file cannot be created |
    /// | [`IoError::CsvWrite`] | Encoding or writing fails |
    #[instrument(skip_all)]
    pub fn write_processed(&self, table: &Table) -> Result<PathBuf, IoError> {
        let path = self.prepare(PROCESSED_TABLE_PATH)?;
        let file = fs::File::create(&path).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        write_csv(table, file).map_err(|e| IoError::CsvWrite {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), n_rows = table.n_rows(), "processed table written");
        Ok(path)
    }

    /// Serialize `value` as pretty JSON to `relative` under the root.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::OutputDirCreate`] | The parent directory cannot be created |
    /// | [`IoError::Serialize`] | `value` fails to serialize |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip(self, value))]
    pub fn write_json<T: Serialize>(&self, relative: &str, value: &T) -> Result<PathBuf, IoError> {
        let path = self.prepare(relative)?;
        let json = serde_json::to_string_pretty(value).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "JSON artifact written");
        Ok(path)
    }
}
