//! Held-out evaluation of a fitted forest.

use tracing::{info, instrument};

use crate::confusion::{AveragedMetrics, ClassMetrics, ConfusionMatrix};
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::importance::RankedFeature;

/// Metrics of a fitted forest on its training and test partitions.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EvaluationResult {
    /// Accuracy on the training partition.
    pub train_accuracy: f64,
    /// Accuracy on the test partition.
    pub test_accuracy: f64,
    /// Test-partition confusion matrix, ascending labels.
    pub confusion_matrix: ConfusionMatrix,
    /// Test-partition metrics per class.
    pub class_metrics: Vec<ClassMetrics>,
    /// Support-weighted averages.
    pub weighted_avg: AveragedMetrics,
    /// Unweighted averages.
    pub macro_avg: AveragedMetrics,
    /// Importances in training feature order.
    pub feature_importances: Vec<f64>,
    /// Importances sorted descending.
    pub ranked_importances: Vec<RankedFeature>,
    /// Training rows.
    pub n_train: usize,
    /// Test rows.
    pub n_test: usize,
}

fn accuracy(predicted: &[usize], labels: &[usize]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = predicted.iter().zip(labels).filter(|(p, l)| p == l).count();
    correct as f64 / labels.len() as f64
}

/// Score `forest` on both partitions.
///
/// The confusion matrix spans every label seen in the forest or the test
/// labels, so a class absent from training still gets a row.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::EmptyDataset`] | The test partition is empty |
/// | [`RfError::LabelCountMismatch`] | Rows and labels differ in count |
/// | [`RfError::PredictionFeatureMismatch`] | A row has the wrong width |
#[instrument(skip_all, fields(n_train = train_labels.len(), n_test = test_labels.len()))]
pub fn evaluate(
    forest: &RandomForest,
    train_features: &[Vec<f64>],
    train_labels: &[usize],
    test_features: &[Vec<f64>],
    test_labels: &[usize],
) -> Result<EvaluationResult, RfError> {
    for (features, labels) in [(train_features, train_labels), (test_features, test_labels)] {
        if features.len() != labels.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: features.len(),
                n_labels: labels.len(),
            });
        }
    }

    let train_pred = forest.predict_batch(train_features)?;
    let test_pred = forest.predict_batch(test_features)?;

    let n_classes = test_labels
        .iter()
        .max()
        .map_or(0, |&m| m + 1)
        .max(forest.n_classes());
    let confusion_matrix = ConfusionMatrix::from_labels(test_labels, &test_pred, n_classes)?;

    let result = EvaluationResult {
        train_accuracy: accuracy(&train_pred, train_labels),
        test_accuracy: confusion_matrix.accuracy(),
        class_metrics: confusion_matrix.class_metrics(),
        weighted_avg: confusion_matrix.weighted_average(),
        macro_avg: confusion_matrix.macro_average(),
        confusion_matrix,
        feature_importances: forest.feature_importances().to_vec(),
        ranked_importances: forest.ranked_importances(),
        n_train: train_labels.len(),
        n_test: test_labels.len(),
    };

    info!(
        train_accuracy = result.train_accuracy,
        test_accuracy = result.test_accuracy,
        weighted_f1 = result.weighted_avg.f1,
        "evaluation complete"
    );
    Ok(result)
}
