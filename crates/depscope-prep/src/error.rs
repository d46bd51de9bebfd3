//! Error types for preprocessing and splitting.

use depscope_io::IoError;

/// Errors from the preprocessing pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// Returned when a missing-strategy name cannot be parsed.
    #[error("unknown missing-value strategy \"{name}\" (expected drop, mean, median, or zero)")]
    UnknownStrategy {
        /// The unrecognized name.
        name: String,
    },

    /// Wraps a table invariant violation raised while rebuilding a column.
    #[error("table error during preprocessing")]
    Table(#[from] IoError),
}

/// Errors from feature/target validation and the train/test split.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Returned when the target column is absent.
    #[error("target column \"{column}\" not found")]
    TargetNotFound {
        /// The configured target column.
        column: String,
    },

    /// Returned when the target column is categorical.
    #[error("target column \"{column}\" is not numeric")]
    TargetNotNumeric {
        /// The configured target column.
        column: String,
    },

    /// Returned when the target column contains a missing marker.
    #[error("target column \"{column}\" has a missing value at row {row}")]
    TargetMissingValue {
        /// The configured target column.
        column: String,
        /// Zero-based row index.
        row: usize,
    },

    /// Returned when a target value is not a non-negative integer class label.
    #[error("target column \"{column}\" has non-class value {value} at row {row}")]
    TargetNotClassLabel {
        /// The configured target column.
        column: String,
        /// Zero-based row index.
        row: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when the class labels are not the dense range `0..k`.
    #[error("target column \"{column}\" skips class {missing} but uses labels up to {max}")]
    SparseClassLabels {
        /// The configured target column.
        column: String,
        /// Smallest label absent from the column.
        missing: usize,
        /// Largest label present.
        max: usize,
    },

    /// Returned when the feature selection resolves to zero columns.
    #[error("feature selection is empty")]
    EmptyFeatureSelection,

    /// Returned when a selected feature is not a candidate column.
    #[error("feature \"{name}\" is not an available feature column")]
    UnknownFeature {
        /// The requested feature name.
        name: String,
    },

    /// Returned when a selected feature column is categorical.
    #[error("feature \"{name}\" is not numeric; enable categorical encoding first")]
    NonNumericFeature {
        /// The offending feature name.
        name: String,
    },

    /// Returned when a selected feature column has a missing marker.
    #[error("feature \"{name}\" has a missing value at row {row}; handle missing values first")]
    MissingFeatureValue {
        /// The offending feature name.
        name: String,
        /// Zero-based row index.
        row: usize,
    },

    /// Returned when the test fraction is not in the open interval (0, 1).
    #[error("test fraction must be in (0, 1), got {fraction}")]
    InvalidTestFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when a class is too small to appear in both partitions.
    #[error("class {class} has only {count} member(s); stratified split needs at least 2")]
    TooFewClassMembers {
        /// The class label.
        class: usize,
        /// Number of rows with this label.
        count: usize,
    },

    /// Returned when a partition cannot hold at least one row of every class.
    #[error("{partition} partition would have {size} rows but there are {n_classes} classes")]
    PartitionTooSmall {
        /// `"train"` or `"test"`.
        partition: &'static str,
        /// Resulting partition size.
        size: usize,
        /// Number of classes present.
        n_classes: usize,
    },
}
