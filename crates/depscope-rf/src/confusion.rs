//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::RfError;

/// A confusion matrix with rows and columns in ascending label order.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassMetrics {
    /// The class label.
    pub class: usize,
    /// `TP / (TP + FP)`; 0.0 if the class was never predicted.
    pub precision: f64,
    /// `TP / (TP + FN)`; 0.0 if the class never occurs.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

/// Precision, recall, and F1 averaged over classes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct AveragedMetrics {
    /// Averaged precision.
    pub precision: f64,
    /// Averaged recall.
    pub recall: f64,
    /// Averaged F1.
    pub f1: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero labels provided |
    /// | [`RfError::LabelCountMismatch`] | The two slices differ in length |
    /// | [`RfError::LabelOutOfRange`] | A label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: predicted.len(),
                n_labels: true_labels.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in true_labels.iter().zip(predicted) {
            if let Some(&label) = [t, p].iter().find(|&&l| l >= n_classes) {
                return Err(RfError::LabelOutOfRange { label, n_classes });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        ratio(correct, self.total())
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted: usize = self.matrix.iter().map(|row| row[c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Unweighted mean of the per-class metrics.
    #[must_use]
    pub fn macro_average(&self) -> AveragedMetrics {
        let metrics = self.class_metrics();
        let n = metrics.len().max(1) as f64;
        AveragedMetrics {
            precision: metrics.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: metrics.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: metrics.iter().map(|m| m.f1).sum::<f64>() / n,
        }
    }

    /// Per-class metrics weighted by support.
    #[must_use]
    pub fn weighted_average(&self) -> AveragedMetrics {
        let metrics = self.class_metrics();
        let total = self.total();
        if total == 0 {
            return AveragedMetrics {
                precision: 0.0,
                recall: 0.0,
                f1: 0.0,
            };
        }
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            metrics.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64
        };
        AveragedMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
        }
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>8}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let labels = vec![0, 0, 1, 1];
        let cm = ConfusionMatrix::from_labels(&labels, &labels, 2).unwrap();
        assert_eq!(cm.accuracy(), 1.0);
        for m in cm.class_metrics() {
            assert_eq!((m.precision, m.recall, m.f1), (1.0, 1.0, 1.0));
        }
    }

    #[test]
    fn binary_metrics_by_hand() {
        // TN=5 FP=1 FN=2 TP=2
        let truth = vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1];
        let pred = vec![0, 0, 0, 0, 0, 1, 0, 0, 1, 1];
        let cm = ConfusionMatrix::from_labels(&truth, &pred, 2).unwrap();
        assert_eq!(cm.as_rows(), &[vec![5, 1], vec![2, 2]]);
        assert_eq!(cm.total(), 10);
        assert!((cm.accuracy() - 0.7).abs() < 1e-12);

        let m = cm.class_metrics();
        assert!((m[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m[1].recall - 0.5).abs() < 1e-12);
        assert!((m[1].f1 - 4.0 / 7.0).abs() < 1e-12);
        assert_eq!(m[0].support, 6);

        let w = cm.weighted_average();
        let expected_recall = (6.0 * (5.0 / 6.0) + 4.0 * 0.5) / 10.0;
        assert!((w.recall - expected_recall).abs() < 1e-12);
        let mac = cm.macro_average();
        assert!((mac.recall - (5.0 / 6.0 + 0.5) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn never_predicted_class_scores_zero() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1], &[0, 0, 0], 2).unwrap();
        let m = cm.class_metrics();
        assert_eq!(m[1].precision, 0.0);
        assert_eq!(m[1].recall, 0.0);
        assert_eq!(m[1].f1, 0.0);
    }

    #[test]
    fn input_errors() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[], 2),
            Err(RfError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0], 2),
            Err(RfError::LabelCountMismatch { .. })
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0, 2], 2),
            Err(RfError::LabelOutOfRange { label: 2, .. })
        ));
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let output = cm.to_string();
        assert!(output.contains("pred_"));
        assert!(output.contains("true_"));
    }
}
