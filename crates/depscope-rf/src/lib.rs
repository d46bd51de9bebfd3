//! Random Forest classification: train, evaluate, predict.
//!
//! A hand-rolled Random Forest of Gini CART trees grown on bootstrap
//! samples, trained in parallel with rayon from per-tree seeds so results
//! do not depend on the thread count. Includes held-out evaluation,
//! impurity-based feature importance, and a versioned model archive.

mod config;
mod confusion;
mod error;
mod eval;
mod forest;
mod importance;
mod node;
mod predict;
mod serialize;
mod split;
mod tree;

pub use config::{DEFAULT_MAX_DEPTH, DEFAULT_N_TREES, DEFAULT_SEED, MaxFeatures, RandomForestConfig};
pub use confusion::{AveragedMetrics, ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use eval::{EvaluationResult, evaluate};
pub use forest::{RandomForest, TrainingMetadata};
pub use importance::{RankedFeature, rank_features};
pub use node::{FeatureIndex, Node, NodeIndex};
pub use predict::ClassProbabilities;
pub use serialize::FORMAT_VERSION;
pub use split::gini;
pub use tree::DecisionTree;
