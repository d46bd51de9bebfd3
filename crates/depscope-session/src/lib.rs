//! Pipeline session for the depscope survey classifier.
//!
//! [`Session`] owns the dataset, preprocessing output, trained forest, and
//! evaluation as a state machine over [`Stage`]. Transitions are gated: a
//! stage run before its prerequisite returns
//! [`SessionError::Precondition`] and changes nothing. Artifact writes are
//! best-effort and reported as [`PersistOutcome`].

mod artifacts;
mod error;
mod session;
mod settings;

pub use artifacts::{ArtifactStore, PersistOutcome};
pub use error::SessionError;
pub use session::{
    LoadedData, Prediction, PreprocessedData, Session, Stage, TrainRequest, TrainedData,
};
pub use settings::{
    ArtifactSettings, ForestSettings, LoadSettings, RunSettings, SplitSettings,
};
