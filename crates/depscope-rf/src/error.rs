use std::path::PathBuf;

/// Errors from forest training, prediction, evaluation, and persistence.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when the forest is configured with zero trees.
    #[error("tree count must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The rejected tree count.
        n_trees: usize,
    },

    /// Returned when the depth limit is zero.
    #[error("max depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The rejected depth limit.
        max_depth: usize,
    },

    /// Returned when fewer than two samples are allowed to split a node.
    #[error("min samples split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The rejected minimum.
        min_samples_split: usize,
    },

    /// Returned when leaves may be empty.
    #[error("min samples leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The rejected minimum.
        min_samples_leaf: usize,
    },

    /// Returned when the per-split feature count resolves outside `[1, n_features]`.
    #[error("max features resolved to {max_features}, must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved count.
        max_features: usize,
        /// Features in the training data.
        n_features: usize,
    },

    /// Returned when there are no samples.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when samples have no feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when feature rows and labels differ in count.
    #[error("{n_samples} feature rows but {n_labels} labels")]
    LabelCountMismatch {
        /// Feature rows supplied.
        n_samples: usize,
        /// Labels supplied.
        n_labels: usize,
    },

    /// Returned when feature names and feature columns differ in count.
    #[error("{n_names} feature names for {n_features} feature columns")]
    FeatureNameMismatch {
        /// Names supplied.
        n_names: usize,
        /// Columns in the data.
        n_features: usize,
    },

    /// Returned when a training row has a different width than the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
        /// Zero-based row index.
        sample_index: usize,
    },

    /// Returned when a prediction input has the wrong width.
    #[error("prediction input has {got} features, model expects {expected}")]
    PredictionFeatureMismatch {
        /// Width the model was trained on.
        expected: usize,
        /// Width of the input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// Zero-based row index.
        sample_index: usize,
        /// Zero-based column index.
        feature_index: usize,
    },

    /// Returned when a label is not below the class count of a confusion matrix.
    #[error("label {label} is out of range for {n_classes} classes")]
    LabelOutOfRange {
        /// The offending label.
        label: usize,
        /// Number of classes.
        n_classes: usize,
    },

    /// Returned when encoding the model archive fails.
    #[error("failed to encode model archive")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when decoding the model archive fails.
    #[error("failed to decode model archive {path}")]
    DeserializeModel {
        /// Archive path.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when the archive cannot be written.
    #[error("failed to write model archive {path}")]
    WriteModel {
        /// Archive path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the archive cannot be read.
    #[error("failed to read model archive {path}")]
    ReadModel {
        /// Archive path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the archive was written by an incompatible format version.
    #[error("model archive {path} has format version {found}, expected {expected}")]
    IncompatibleModelVersion {
        /// Version this build reads.
        expected: u32,
        /// Version in the archive.
        found: u32,
        /// Archive path.
        path: PathBuf,
    },
}
