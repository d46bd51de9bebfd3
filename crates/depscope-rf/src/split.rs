//! Gini impurity and exact best-split search over a node's samples.

use rand::Rng;

use crate::node::FeatureIndex;

/// Gini impurity `1 − Σ pᵢ²` of a node with the given class counts.
/// An empty node is pure.
#[must_use]
pub fn gini(class_counts: &[usize], n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    1.0 - class_counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// The winning split of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SplitCandidate {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    pub(crate) weighted_decrease: f64,
}

/// Shared, read-only inputs for split search within one tree.
///
/// `columns[feature][row]` is column-major; node sample lists index rows
/// and may repeat a row (bootstrap draws).
pub(crate) struct SplitSearch<'a> {
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitSearch<'_> {
    /// Count labels of `samples`.
    pub(crate) fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &row in samples {
            counts[self.labels[row]] += 1;
        }
        counts
    }

    /// Find the best split of `samples` among randomly drawn features.
    ///
    /// Features are visited in a random order until `max_features` of them
    /// have been evaluated; features that are constant within the node do
    /// not count toward that limit. Returns `None` when no threshold leaves
    /// at least `min_samples_leaf` samples on both sides.
    pub(crate) fn best(
        &self,
        samples: &[usize],
        parent_counts: &[usize],
        rng: &mut impl Rng,
        scratch: &mut Vec<(f64, usize)>,
    ) -> Option<SplitCandidate> {
        let n = samples.len();
        let n_features = self.columns.len();
        let parent_weighted = n as f64 * gini(parent_counts, n);

        let mut order: Vec<usize> = (0..n_features).collect();
        let mut evaluated = 0;
        let mut best: Option<SplitCandidate> = None;

        for i in 0..n_features {
            if evaluated == self.max_features {
                break;
            }
            let j = rng.gen_range(i..n_features);
            order.swap(i, j);
            let feature = order[i];
            let column = &self.columns[feature];

            scratch.clear();
            scratch.extend(samples.iter().map(|&row| (column[row], self.labels[row])));
            scratch.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
            if scratch[0].0 == scratch[n - 1].0 {
                continue;
            }
            evaluated += 1;

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent_counts.to_vec();
            for k in 0..n - 1 {
                let (value, class) = scratch[k];
                left[class] += 1;
                right[class] -= 1;
                let next = scratch[k + 1].0;
                let n_left = k + 1;
                let n_right = n - n_left;
                if value == next || n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }
                let decrease = parent_weighted
                    - n_left as f64 * gini(&left, n_left)
                    - n_right as f64 * gini(&right, n_right);
                if best.is_none_or(|b| decrease > b.weighted_decrease) {
                    let mut threshold = value / 2.0 + next / 2.0;
                    // Rounding can land the midpoint on the upper value.
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature: FeatureIndex::new(feature),
                        threshold,
                        weighted_decrease: decrease,
                    });
                }
            }
        }
        best
    }

    /// Reorder `samples` so rows going left come first; return the left count.
    pub(crate) fn partition(&self, samples: &mut [usize], split: &SplitCandidate) -> usize {
        let column = &self.columns[split.feature.index()];
        let mut n_left = 0;
        for k in 0..samples.len() {
            if column[samples[k]] <= split.threshold {
                samples.swap(k, n_left);
                n_left += 1;
            }
        }
        n_left
    }
}
