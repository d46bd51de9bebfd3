//! Preprocessing, profiling, and train/test splitting for survey tables.

pub mod config;
pub mod dedup;
pub mod encode;
pub mod error;
pub mod missing;
pub mod pipeline;
pub mod profile;
pub mod split;

pub use config::{MissingStrategy, PreprocessConfig};
pub use encode::{EncodingState, LabelEncoder};
pub use error::{PrepError, ValidationError};
pub use missing::FittedMissing;
pub use pipeline::{FittedPreprocessor, PreprocessOutput, PreprocessReport, preprocess};
pub use profile::{DatasetProfile, profile};
pub use split::{FeatureSelection, SplitConfig, SplitData, split};
