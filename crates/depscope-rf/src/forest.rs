//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::split::SplitSearch;
use crate::tree::{DecisionTree, GrowthLimits};

/// Facts about the training run, stored with the model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainingMetadata {
    /// Trees in the ensemble.
    pub n_trees: usize,
    /// Training rows.
    pub n_samples: usize,
    /// Features drawn at each split.
    pub max_features_resolved: usize,
    /// Depth limit in effect.
    pub max_depth: Option<usize>,
    /// Minimum node size eligible for splitting.
    pub min_samples_split: usize,
    /// Master seed.
    pub seed: u64,
}

/// A fitted Random Forest classifier.
///
/// Immutable once trained; retraining produces a new value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) importances: Vec<f64>,
    pub(crate) metadata: TrainingMetadata,
}

/// Draw `n_samples` row indices with replacement.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Check shapes and values of the training data; return the row width.
fn validate_data(
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<usize, RfError> {
    let Some(first) = features.first() else {
        return Err(RfError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    if feature_names.len() != n_features {
        return Err(RfError::FeatureNameMismatch {
            n_names: feature_names.len(),
            n_features,
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Transpose row-major samples into one vector per feature.
fn to_columns(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|j| features.iter().map(|row| row[j]).collect())
        .collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForest, RfError> {
    config.validate()?;
    let n_features = validate_data(features, labels, feature_names)?;
    let max_features = config.max_features.resolve(n_features)?;

    let n_samples = features.len();
    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
    let columns = to_columns(features, n_features);

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features,
        "training random forest"
    );

    // Seeds are drawn up front so tree i is the same whatever thread builds it.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let search = SplitSearch {
        columns: &columns,
        labels,
        n_classes,
        max_features,
        min_samples_leaf: config.min_samples_leaf,
    };
    let limits = GrowthLimits {
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
    };

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let samples = bootstrap_sample(n_samples, &mut rng);
            DecisionTree::grow(&search, limits, samples, &mut rng)
        })
        .collect();

    debug!(
        n_nodes = trees.iter().map(DecisionTree::n_nodes).sum::<usize>(),
        "tree training complete"
    );

    let per_tree: Vec<Vec<f64>> = trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree, n_features);

    let metadata = TrainingMetadata {
        n_trees: trees.len(),
        n_samples,
        max_features_resolved: max_features,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        seed: config.seed,
    };

    info!(
        mean_depth = trees.iter().map(DecisionTree::depth).sum::<usize>() as f64 / trees.len() as f64,
        "random forest training complete"
    );

    Ok(RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
        importances,
        metadata,
    })
}

impl RandomForest {
    /// Borrow the trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
