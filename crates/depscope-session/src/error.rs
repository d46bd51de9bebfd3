//! Error types for the pipeline session.

use std::path::PathBuf;

use depscope_io::IoError;
use depscope_prep::{PrepError, ValidationError};
use depscope_rf::RfError;

use crate::session::Stage;

/// Errors surfaced by session transitions and settings loading.
///
/// A transition that returns any of these leaves the session unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Returned when a stage runs before the stage it depends on.
    #[error("{operation} needs a {required} session, but the session is {current}")]
    Precondition {
        /// The refused transition.
        operation: &'static str,
        /// Earliest stage that allows it.
        required: Stage,
        /// Stage the session is in.
        current: Stage,
    },

    /// Wraps a malformed or unreadable input table.
    #[error("failed to load dataset")]
    Load(#[from] IoError),

    /// Wraps a preprocessing failure.
    #[error("preprocessing failed")]
    Prep(#[from] PrepError),

    /// Wraps a target, feature, or split validation failure.
    #[error("invalid training input")]
    Validation(#[from] ValidationError),

    /// Wraps a training, prediction, or evaluation failure.
    #[error("classifier error")]
    Training(#[from] RfError),

    /// Returned when the settings file cannot be read.
    #[error("cannot read settings file {path}")]
    SettingsRead {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the settings file is not valid settings JSON.
    #[error("invalid settings file {path}")]
    SettingsParse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },
}
