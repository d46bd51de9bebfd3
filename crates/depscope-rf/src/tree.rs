//! CART decision trees grown on bootstrap samples.

use rand::Rng;
use tracing::trace;

use crate::node::{Node, NodeIndex};
use crate::split::{SplitSearch, gini};

/// Stopping rules for growing one tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowthLimits {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
}

/// A node waiting to be grown: `samples[start..end]` reached it at `depth`.
struct Pending {
    node: NodeIndex,
    start: usize,
    end: usize,
    depth: usize,
}

/// A fitted decision tree, stored as a node arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Grow a tree over `samples`, which index rows of the search columns.
    ///
    /// Nodes are expanded depth-first from an explicit stack. `samples` is
    /// reordered in place so that every node owns a contiguous range.
    pub(crate) fn grow(
        search: &SplitSearch<'_>,
        limits: GrowthLimits,
        mut samples: Vec<usize>,
        rng: &mut impl Rng,
    ) -> Self {
        let mut nodes = vec![Node::leaf(&[])];
        let mut stack = vec![Pending {
            node: NodeIndex::ROOT,
            start: 0,
            end: samples.len(),
            depth: 0,
        }];
        let mut scratch = Vec::with_capacity(samples.len());

        while let Some(p) = stack.pop() {
            let node_samples = &mut samples[p.start..p.end];
            let n = node_samples.len();
            let counts = search.class_counts(node_samples);

            let at_depth_limit = limits.max_depth.is_some_and(|d| p.depth >= d);
            if n < limits.min_samples_split || at_depth_limit || gini(&counts, n) == 0.0 {
                nodes[p.node.index()] = Node::leaf(&counts);
                continue;
            }
            let Some(split) = search.best(node_samples, &counts, rng, &mut scratch) else {
                nodes[p.node.index()] = Node::leaf(&counts);
                continue;
            };

            let n_left = search.partition(node_samples, &split);
            let left = NodeIndex::new(nodes.len());
            let right = NodeIndex::new(nodes.len() + 1);
            nodes.push(Node::leaf(&[]));
            nodes.push(Node::leaf(&[]));
            nodes[p.node.index()] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
                n_samples: n,
                weighted_decrease: split.weighted_decrease,
            };

            let mid = p.start + n_left;
            stack.push(Pending {
                node: right,
                start: mid,
                end: p.end,
                depth: p.depth + 1,
            });
            stack.push(Pending {
                node: left,
                start: p.start,
                end: mid,
                depth: p.depth + 1,
            });
        }

        trace!(n_nodes = nodes.len(), "tree grown");
        Self {
            nodes,
            n_features: search.columns.len(),
            n_classes: search.n_classes,
        }
    }

    /// Class distribution of the leaf `sample` lands in.
    ///
    /// `sample` must have at least `n_features` values.
    #[must_use]
    pub fn leaf_distribution(&self, sample: &[f64]) -> &[f64] {
        let mut idx = NodeIndex::ROOT;
        loop {
            match &self.nodes[idx.index()] {
                Node::Leaf { distribution, .. } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Impurity-decrease importance per feature, normalized to sum to 1.
    /// All zeros for a single-leaf tree.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                weighted_decrease,
                ..
            } = node
            {
                totals[feature.index()] += weighted_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            for v in &mut totals {
                *v /= sum;
            }
        }
        totals
    }

    /// Number of classes in each leaf distribution.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Arena nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Total node count.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Leaf count.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf path; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(NodeIndex::ROOT, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &self.nodes[idx.index()] {
                Node::Leaf { .. } => deepest = deepest.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((*left, d + 1));
                    stack.push((*right, d + 1));
                }
            }
        }
        deepest
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn fit(columns: &[Vec<f64>], labels: &[usize], max_depth: Option<usize>) -> DecisionTree {
        let search = SplitSearch {
            columns,
            labels,
            n_classes: labels.iter().max().map_or(1, |m| m + 1),
            max_features: columns.len(),
            min_samples_leaf: 1,
        };
        let limits = GrowthLimits {
            max_depth,
            min_samples_split: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        DecisionTree::grow(&search, limits, (0..labels.len()).collect(), &mut rng)
    }

    #[test]
    fn pure_node_is_single_leaf() {
        let tree = fit(&[vec![1.0, 2.0, 3.0]], &[0, 0, 0], None);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.leaf_distribution(&[9.0]), &[1.0]);
        assert!(tree.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn separable_data() {
        let columns = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0], vec![0.0; 6]];
        let tree = fit(&columns, &[0, 0, 0, 1, 1, 1], None);
        assert_eq!(tree.leaf_distribution(&[2.0, 0.0]), &[1.0, 0.0]);
        assert_eq!(tree.leaf_distribution(&[11.0, 0.0]), &[0.0, 1.0]);
        assert_eq!(tree.feature_importances(), vec![1.0, 0.0]);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn xor_needs_two_levels() {
        let columns = vec![vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 1.0, 0.0, 1.0]];
        let labels = [0, 1, 1, 0];
        let tree = fit(&columns, &labels, None);
        assert_eq!(tree.depth(), 2);
        for row in 0..4 {
            let dist = tree.leaf_distribution(&[columns[0][row], columns[1][row]]);
            assert_eq!(dist[labels[row]], 1.0);
        }
    }

    #[test]
    fn depth_limit_respected() {
        let columns = vec![vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 1.0, 0.0, 1.0]];
        let tree = fit(&columns, &[0, 1, 1, 0], Some(1));
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn bootstrap_duplicates_weight_leaves() {
        let columns = vec![vec![1.0, 5.0]];
        let labels = [0, 1];
        let search = SplitSearch {
            columns: &columns,
            labels: &labels,
            n_classes: 2,
            max_features: 1,
            min_samples_leaf: 1,
        };
        let limits = GrowthLimits {
            max_depth: Some(1),
            min_samples_split: 10,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = DecisionTree::grow(&search, limits, vec![0, 0, 0, 1], &mut rng);
        assert_eq!(tree.leaf_distribution(&[3.0]), &[0.75, 0.25]);
    }
}
