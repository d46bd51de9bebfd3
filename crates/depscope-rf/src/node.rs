use std::fmt;

/// Zero-based feature column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Column position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Position of a node in its tree's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The root is always the first node.
    pub(crate) const ROOT: NodeIndex = NodeIndex(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A decision-tree node. Children are arena indices, not pointers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Interior node: `sample[feature] <= threshold` goes left.
    Split {
        /// Tested feature.
        feature: FeatureIndex,
        /// Midpoint between the two closest values on either side.
        threshold: f64,
        /// Left child.
        left: NodeIndex,
        /// Right child.
        right: NodeIndex,
        /// Training samples reaching this node.
        n_samples: usize,
        /// `n·G(node) − n_l·G(left) − n_r·G(right)` for Gini impurity `G`.
        weighted_decrease: f64,
    },
    /// Terminal node.
    Leaf {
        /// Class proportions of the training samples in the leaf.
        distribution: Vec<f64>,
        /// Training samples in the leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// `true` for a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Leaf built from class counts. The counts must not all be zero.
    pub(crate) fn leaf(class_counts: &[usize]) -> Node {
        let n_samples: usize = class_counts.iter().sum();
        let total = n_samples.max(1) as f64;
        Node::Leaf {
            distribution: class_counts.iter().map(|&c| c as f64 / total).collect(),
            n_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_distribution_from_counts() {
        let leaf = Node::leaf(&[1, 3]);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.n_samples(), 4);
        match leaf {
            Node::Leaf { distribution, .. } => assert_eq!(distribution, vec![0.25, 0.75]),
            Node::Split { .. } => panic!("expected a leaf"),
        }
    }

    #[test]
    fn index_display() {
        assert_eq!(FeatureIndex::new(3).to_string(), "f3");
        assert_eq!(NodeIndex::ROOT.to_string(), "#0");
    }
}
