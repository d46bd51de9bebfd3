//! Best-effort artifact persistence.
//!
//! Failures here never fail a transition: they are logged at warn level and
//! reported as [`PersistOutcome::Skipped`].

use std::path::{Path, PathBuf};

use depscope_io::{ArtifactWriter, IoError, MODEL_PATH, Table};
use depscope_rf::RandomForest;
use tracing::warn;

/// What happened to one artifact.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// The artifact was written.
    Written {
        /// Final path.
        path: PathBuf,
    },
    /// Writing failed; the session carried on.
    Skipped {
        /// Intended path.
        path: PathBuf,
        /// Why the write failed.
        reason: String,
    },
}

impl PersistOutcome {
    /// `true` if the artifact is on disk.
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, PersistOutcome::Written { .. })
    }

    /// Path written, or that would have been.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            PersistOutcome::Written { path } | PersistOutcome::Skipped { path, .. } => path,
        }
    }
}

/// Error text including the source chain.
fn describe(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn skipped(path: PathBuf, err: &dyn std::error::Error, artifact: &str) -> PersistOutcome {
    let reason = describe(err);
    warn!(artifact, path = %path.display(), %reason, "artifact not written");
    PersistOutcome::Skipped { path, reason }
}

/// Writes the processed table and model archive under a fixed root.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Artifact root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the processed table as CSV.
    pub fn persist_table(&self, table: &Table) -> PersistOutcome {
        let path = self.root.join(depscope_io::PROCESSED_TABLE_PATH);
        match ArtifactWriter::new(&self.root).and_then(|w| w.write_processed(table)) {
            Ok(path) => PersistOutcome::Written { path },
            Err(e) => skipped(path, &e, "processed table"),
        }
    }

    /// Write the model archive.
    pub fn persist_model(&self, forest: &RandomForest) -> PersistOutcome {
        let target = self.root.join(MODEL_PATH);
        let prepared: Result<PathBuf, IoError> =
            ArtifactWriter::new(&self.root).and_then(|w| w.prepare(MODEL_PATH));
        let path = match prepared {
            Ok(path) => path,
            Err(e) => return skipped(target, &e, "model"),
        };
        match forest.save(&path) {
            Ok(()) => PersistOutcome::Written { path },
            Err(e) => skipped(path, &e, "model"),
        }
    }
}

#[cfg(test)]
mod tests {
    use depscope_io::Column;

    use super::*;

    fn table() -> Table {
        Table::new(vec![Column::numeric("x", vec![Some(1.0), None])]).unwrap()
    }

    #[test]
    fn table_written_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let outcome = store.persist_table(&table());
        assert!(outcome.is_written());
        assert_eq!(outcome.path(), dir.path().join("data/processed_dataset.csv"));
        let text = std::fs::read_to_string(outcome.path()).unwrap();
        assert!(text.starts_with("x\n"));
    }

    #[test]
    fn unwritable_root_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the root directory should be.
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();

        let outcome = ArtifactStore::new(&blocker).persist_table(&table());
        match outcome {
            PersistOutcome::Skipped { path, reason } => {
                assert_eq!(path, blocker.join("data/processed_dataset.csv"));
                assert!(!reason.is_empty());
            }
            PersistOutcome::Written { .. } => panic!("expected skip"),
        }
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(PersistOutcome::Written {
            path: PathBuf::from("a.csv"),
        })
        .unwrap();
        assert_eq!(json["status"], "written");
        assert_eq!(json["path"], "a.csv");
    }
}
