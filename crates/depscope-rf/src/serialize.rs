//! Model archive: a versioned bincode envelope around the forest.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Archive format version this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// Fields read before the forest, so a version mismatch is reported even
/// when the forest layout changed.
#[derive(serde::Serialize, serde::Deserialize)]
struct ArchiveHeader {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
}

#[derive(serde::Serialize)]
struct ArchiveRef<'a> {
    header: ArchiveHeader,
    forest: &'a RandomForest,
}

#[derive(serde::Deserialize)]
struct ArchiveOwned {
    header: ArchiveHeader,
    forest: RandomForest,
}

impl RandomForest {
    /// Encode the model as archive bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::SerializeModel`] if bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RfError> {
        let archive = ArchiveRef {
            header: ArchiveHeader {
                format_version: FORMAT_VERSION,
                n_trees: self.trees.len(),
                n_features: self.n_features,
                n_classes: self.n_classes,
            },
            forest: self,
        };
        bincode::serialize(&archive).map_err(|source| RfError::SerializeModel { source })
    }

    /// Save the model archive to `path`. Parent directories must exist.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes).map_err(|source| RfError::WriteModel {
            path: path.to_path_buf(),
            source,
        })?;
        info!(size_bytes = bytes.len(), n_trees = self.trees.len(), "model saved");
        Ok(())
    }

    /// Load a model archive written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| RfError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;
        let decode_err = |source| RfError::DeserializeModel {
            path: path.to_path_buf(),
            source,
        };

        let header: ArchiveHeader = bincode::deserialize(&bytes).map_err(decode_err)?;
        if header.format_version != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: header.format_version,
                path: path.to_path_buf(),
            });
        }

        let archive: ArchiveOwned = bincode::deserialize(&bytes).map_err(decode_err)?;
        debug!(
            n_trees = archive.header.n_trees,
            n_features = archive.header.n_features,
            n_classes = archive.header.n_classes,
            "model loaded"
        );
        Ok(archive.forest)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::RandomForestConfig;

    fn train_simple_model() -> RandomForest {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let names = vec!["x".to_string(), "y".to_string()];
        RandomForestConfig::new(5)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap()
    }

    #[test]
    fn saved_model_loads_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let forest = train_simple_model();
        forest.save(&path).unwrap();

        let loaded = RandomForest::load(&path).unwrap();
        assert_eq!(loaded, forest);
        assert_eq!(
            loaded.predict_proba(&[5.0, 0.0]).unwrap(),
            forest.predict_proba(&[5.0, 0.0]).unwrap()
        );
    }

    #[test]
    fn load_missing_file_error() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, RfError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"short").unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, RfError::DeserializeModel { .. }));
    }

    #[test]
    fn future_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        let mut bytes = train_simple_model().to_bytes().unwrap();
        // bincode writes the leading u32 little-endian.
        bytes[..4].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(
            err,
            RfError::IncompatibleModelVersion { found, .. } if found == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let err = train_simple_model()
            .save(dir.path().join("no/such/dir/model.bin"))
            .unwrap_err();
        assert!(matches!(err, RfError::WriteModel { .. }));
    }
}
