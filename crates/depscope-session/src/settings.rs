//! Run settings loaded from a JSON file.
//!
//! Every section and field is optional; omitted values take the defaults of
//! the underlying configs. Example:
//!
//! ```json
//! {
//!   "load": { "missing_tokens": ["?", "NA"] },
//!   "preprocess": { "missing": "median", "remove_duplicates": true },
//!   "split": { "test_fraction": 0.25, "features": ["Age", "CGPA"] },
//!   "forest": { "n_trees": 200, "max_depth": 12 },
//!   "artifacts": { "root": "out", "persist": true }
//! }
//! ```

use std::path::{Path, PathBuf};

use depscope_io::{DEFAULT_MISSING_TOKENS, TableReader};
use depscope_prep::split::{DEFAULT_SPLIT_SEED, DEFAULT_TEST_FRACTION};
use depscope_prep::{FeatureSelection, PreprocessConfig, SplitConfig, ValidationError};
use depscope_rf::{DEFAULT_MAX_DEPTH, DEFAULT_N_TREES, DEFAULT_SEED, MaxFeatures, RandomForestConfig, RfError};
use tracing::{debug, instrument};

use crate::error::SessionError;
use crate::session::TrainRequest;

/// Loader settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoadSettings {
    /// Cell values read as missing.
    pub missing_tokens: Vec<String>,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            missing_tokens: DEFAULT_MISSING_TOKENS.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

/// Splitter settings.
///
/// The target defaults to the preprocessing target column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SplitSettings {
    /// Target column override.
    pub target: Option<String>,
    /// Explicit feature columns; `None` uses every candidate column.
    pub features: Option<Vec<String>>,
    /// Fraction of rows held out for testing.
    pub test_fraction: f64,
    /// Shuffle seed.
    pub seed: u64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            target: None,
            features: None,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ForestSettings {
    /// Trees in the ensemble.
    pub n_trees: usize,
    /// Depth limit; `null` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum node size eligible for splitting.
    pub min_samples_split: usize,
    /// Minimum samples in each child of a split.
    pub min_samples_leaf: usize,
    /// Features drawn per split.
    pub max_features: MaxFeatures,
    /// Master seed.
    pub seed: u64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_N_TREES,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            seed: DEFAULT_SEED,
        }
    }
}

/// Where artifacts go, and whether to write them at all.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    /// Artifact root directory.
    pub root: PathBuf,
    /// Write the processed table and model archive.
    pub persist: bool,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            persist: true,
        }
    }
}

/// Complete settings for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Loader settings.
    pub load: LoadSettings,
    /// Preprocessing steps.
    pub preprocess: PreprocessConfig,
    /// Split settings.
    pub split: SplitSettings,
    /// Forest hyperparameters.
    pub forest: ForestSettings,
    /// Artifact settings.
    pub artifacts: ArtifactSettings,
}

impl RunSettings {
    /// Read settings from a JSON file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SessionError::SettingsRead`] | The file cannot be read |
    /// | [`SessionError::SettingsParse`] | The JSON does not match the settings layout |
    #[instrument(fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Self, SessionError> {
        let text = std::fs::read_to_string(path).map_err(|source| SessionError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&text).map_err(|source| SessionError::SettingsParse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(?settings, "settings loaded");
        Ok(settings)
    }

    /// Build the table reader.
    #[must_use]
    pub fn table_reader(&self) -> TableReader {
        TableReader::new().with_missing_tokens(self.load.missing_tokens.iter().cloned())
    }

    /// Target column used for splitting.
    #[must_use]
    pub fn target(&self) -> &str {
        self.split
            .target
            .as_deref()
            .unwrap_or(self.preprocess.target_column())
    }

    /// Build the split config.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTestFraction`] for a fraction outside (0, 1).
    pub fn split_config(&self) -> Result<SplitConfig, ValidationError> {
        let features = match &self.split.features {
            Some(names) => FeatureSelection::Columns(names.clone()),
            None => FeatureSelection::All,
        };
        Ok(SplitConfig::new(self.split.test_fraction)?
            .with_target(self.target())
            .with_features(features)
            .with_seed(self.split.seed))
    }

    /// Build the forest config.
    ///
    /// # Errors
    ///
    /// Returns any [`RfError`] from [`RandomForestConfig::new`] or
    /// [`RandomForestConfig::validate`].
    pub fn forest_config(&self) -> Result<RandomForestConfig, RfError> {
        let f = &self.forest;
        let config = RandomForestConfig::new(f.n_trees)?
            .with_max_depth(f.max_depth)
            .with_min_samples_split(f.min_samples_split)
            .with_min_samples_leaf(f.min_samples_leaf)
            .with_max_features(f.max_features)
            .with_seed(f.seed);
        config.validate()?;
        Ok(config)
    }

    /// Build the train request from the split and forest sections.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Validation`] or [`SessionError::Training`] for
    /// out-of-range values.
    pub fn train_request(&self) -> Result<TrainRequest, SessionError> {
        Ok(TrainRequest::new(self.split_config()?, self.forest_config()?))
    }
}
