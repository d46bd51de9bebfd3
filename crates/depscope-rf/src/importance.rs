//! Feature importance aggregation across trees.

/// A feature with its normalized importance and 1-based rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Sum per-tree importances positionally and normalize to 1.0.
///
/// All zeros when no tree ever split.
pub(crate) fn aggregate_importances(per_tree: &[Vec<f64>], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0f64; n_features];
    for tree_imp in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_imp) {
            *total += val;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }
    totals
}

/// Pair importances with names and sort descending.
///
/// Ties keep training feature order.
#[must_use]
pub fn rank_features(names: &[String], importances: &[f64]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(importances)
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_normalizes() {
        let imp = aggregate_importances(&[vec![1.0, 0.0], vec![0.5, 0.5]], 2);
        assert!((imp[0] - 0.75).abs() < 1e-12);
        assert!((imp[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn aggregate_all_leaves_is_zero() {
        assert_eq!(aggregate_importances(&[vec![0.0, 0.0]], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let ranked = rank_features(&names, &[0.25, 0.5, 0.25]);
        let order: Vec<&str> = ranked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
        assert_eq!(ranked[2].rank, 3);
    }
}
