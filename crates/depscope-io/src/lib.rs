//! Table model, CSV loading, and artifact writing for the depscope pipeline.

mod error;
mod reader;
mod table;
mod writer;

pub use error::IoError;
pub use reader::{DEFAULT_MISSING_TOKENS, TableReader};
pub use table::{CellKey, Column, ColumnData, ColumnKind, Table, Value};
pub use writer::{
    ArtifactWriter, EVALUATION_PATH, MODEL_PATH, PREDICTIONS_PATH, PROCESSED_TABLE_PATH,
    write_csv,
};
