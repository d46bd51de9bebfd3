//! Feature/target extraction and the stratified train/test split.

use std::collections::BTreeMap;

use depscope_io::{ColumnData, Table};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::config::DEFAULT_TARGET;
use crate::error::ValidationError;

/// Default share of rows assigned to the test partition.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
/// Default seed for the split shuffle.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Column names never offered as features, compared case-insensitively.
const ROW_ID_COLUMNS: [&str; 2] = ["id", "index"];

/// Which candidate columns become features.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FeatureSelection {
    /// Every candidate column, in table order.
    #[default]
    All,
    /// An explicit list, in the given order.
    Columns(Vec<String>),
}

/// Configuration for [`split`].
///
/// # Defaults
///
/// | Parameter       | Default        |
/// |-----------------|----------------|
/// | `target`        | `"Depression"` |
/// | `features`      | `All`          |
/// | `test_fraction` | `0.2`          |
/// | `seed`          | `42`           |
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub(crate) target: String,
    pub(crate) features: FeatureSelection,
    pub(crate) test_fraction: f64,
    pub(crate) seed: u64,
}

impl SplitConfig {
    /// Create a config with the given test fraction.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTestFraction`] unless `0 < test_fraction < 1`.
    pub fn new(test_fraction: f64) -> Result<Self, ValidationError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(ValidationError::InvalidTestFraction {
                fraction: test_fraction,
            });
        }
        Ok(Self {
            target: DEFAULT_TARGET.to_string(),
            features: FeatureSelection::All,
            test_fraction,
            seed: DEFAULT_SPLIT_SEED,
        })
    }

    /// Set the target column.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Set the feature selection.
    #[must_use]
    pub fn with_features(mut self, features: FeatureSelection) -> Self {
        self.features = features;
        self
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the target column name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the feature selection.
    #[must_use]
    pub fn features(&self) -> &FeatureSelection {
        &self.features
    }

    /// Return the test fraction.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Return the shuffle seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            features: FeatureSelection::All,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

/// Train and test partitions ready for the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitData {
    /// Feature column names, matching the inner order of every feature row.
    pub feature_names: Vec<String>,
    /// Row-major training features.
    pub train_features: Vec<Vec<f64>>,
    /// Training class labels.
    pub train_labels: Vec<usize>,
    /// Row-major test features.
    pub test_features: Vec<Vec<f64>>,
    /// Test class labels.
    pub test_labels: Vec<usize>,
    /// Source-table row of each training sample.
    pub train_rows: Vec<usize>,
    /// Source-table row of each test sample.
    pub test_rows: Vec<usize>,
    /// One past the largest label in the table.
    pub n_classes: usize,
}

/// Columns eligible as features: everything except the target and row ids.
#[must_use]
pub fn candidate_features<'a>(table: &'a Table, target: &str) -> Vec<&'a str> {
    table
        .column_names()
        .into_iter()
        .filter(|name| *name != target)
        .filter(|name| !ROW_ID_COLUMNS.iter().any(|id| name.eq_ignore_ascii_case(id)))
        .collect()
}

/// Read the target column as class labels.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ValidationError::TargetNotFound`] | No column named `target` |
/// | [`ValidationError::TargetNotNumeric`] | The column is categorical |
/// | [`ValidationError::TargetMissingValue`] | A cell is the missing marker |
/// | [`ValidationError::TargetNotClassLabel`] | A value is negative or fractional |
pub fn target_labels(table: &Table, target: &str) -> Result<Vec<usize>, ValidationError> {
    let column = table.column(target).ok_or_else(|| ValidationError::TargetNotFound {
        column: target.to_string(),
    })?;
    let cells = column.as_numeric().ok_or_else(|| ValidationError::TargetNotNumeric {
        column: target.to_string(),
    })?;
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let value = cell.ok_or_else(|| ValidationError::TargetMissingValue {
                column: target.to_string(),
                row,
            })?;
            if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
                return Err(ValidationError::TargetNotClassLabel {
                    column: target.to_string(),
                    row,
                    value,
                });
            }
            Ok(value as usize)
        })
        .collect()
}

/// Resolve a feature selection against the candidate columns.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ValidationError::EmptyFeatureSelection`] | The selection resolves to no columns |
/// | [`ValidationError::UnknownFeature`] | A listed name is not a candidate |
pub fn resolve_features(
    table: &Table,
    target: &str,
    selection: &FeatureSelection,
) -> Result<Vec<String>, ValidationError> {
    let candidates = candidate_features(table, target);
    let names: Vec<String> = match selection {
        FeatureSelection::All => candidates.iter().map(|s| (*s).to_string()).collect(),
        FeatureSelection::Columns(requested) => {
            let mut names: Vec<String> = Vec::with_capacity(requested.len());
            for name in requested {
                if !candidates.contains(&name.as_str()) {
                    return Err(ValidationError::UnknownFeature { name: name.clone() });
                }
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            names
        }
    };
    if names.is_empty() {
        return Err(ValidationError::EmptyFeatureSelection);
    }
    Ok(names)
}

/// Build the row-major feature matrix for `names`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ValidationError::UnknownFeature`] | A name is not a column |
/// | [`ValidationError::NonNumericFeature`] | A column is categorical |
/// | [`ValidationError::MissingFeatureValue`] | A cell is the missing marker |
pub fn feature_matrix(table: &Table, names: &[String]) -> Result<Vec<Vec<f64>>, ValidationError> {
    let mut matrix: Vec<Vec<f64>> = vec![Vec::with_capacity(names.len()); table.n_rows()];
    for name in names {
        let column = table
            .column(name)
            .ok_or_else(|| ValidationError::UnknownFeature { name: name.clone() })?;
        let ColumnData::Numeric(cells) = column.data() else {
            return Err(ValidationError::NonNumericFeature { name: name.clone() });
        };
        for (row, (cell, out)) in cells.iter().zip(matrix.iter_mut()).enumerate() {
            let value = cell.ok_or_else(|| ValidationError::MissingFeatureValue {
                name: name.clone(),
                row,
            })?;
            out.push(value);
        }
    }
    Ok(matrix)
}

/// Per-class test counts by largest-remainder allocation of `n_test`,
/// clamped so every class keeps at least one row in each partition.
fn allocate_test_counts(class_counts: &[usize], n_test: usize) -> Vec<usize> {
    let n: usize = class_counts.iter().sum();
    let quotas: Vec<f64> = class_counts
        .iter()
        .map(|&c| n_test as f64 * c as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();

    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    // Fractional parts sum to less than the class count.
    let remaining = n_test - alloc.iter().sum::<usize>();
    for &class in order.iter().take(remaining) {
        alloc[class] += 1;
    }

    for (a, &count) in alloc.iter_mut().zip(class_counts) {
        *a = (*a).clamp(1, count - 1);
    }
    let mut total: usize = alloc.iter().sum();
    while total > n_test {
        let Some(class) = (0..alloc.len())
            .filter(|&c| alloc[c] > 1)
            .max_by(|&a, &b| (alloc[a] as f64 - quotas[a]).total_cmp(&(alloc[b] as f64 - quotas[b])))
        else {
            break;
        };
        alloc[class] -= 1;
        total -= 1;
    }
    while total < n_test {
        let Some(class) = (0..alloc.len())
            .filter(|&c| alloc[c] + 1 < class_counts[c])
            .max_by(|&a, &b| (quotas[a] - alloc[a] as f64).total_cmp(&(quotas[b] - alloc[b] as f64)))
        else {
            break;
        };
        alloc[class] += 1;
        total += 1;
    }
    alloc
}

/// Split `table` into stratified train and test partitions.
///
/// `n_test = ceil(test_fraction × n_rows)`. Each class receives its
/// proportional share of the test rows (largest remainder), and rows within
/// a class are chosen by a ChaCha8 shuffle seeded from the config, so the
/// same table and config always give the same partitions.
///
/// # Errors
///
/// Returns the [`ValidationError`] of [`target_labels`], [`resolve_features`],
/// or [`feature_matrix`], and additionally:
///
/// | Variant | Condition |
/// |---|---|
/// | [`ValidationError::SparseClassLabels`] | Some label below the largest one never occurs |
/// | [`ValidationError::TooFewClassMembers`] | A class has fewer than 2 rows |
/// | [`ValidationError::PartitionTooSmall`] | A partition has fewer rows than there are classes |
#[instrument(skip_all, fields(n_rows = table.n_rows(), target = config.target(), seed = config.seed()))]
pub fn split(table: &Table, config: &SplitConfig) -> Result<SplitData, ValidationError> {
    let labels = target_labels(table, config.target())?;
    let feature_names = resolve_features(table, config.target(), config.features())?;
    let matrix = feature_matrix(table, &feature_names)?;

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(row);
    }
    // Class count sizes leaf distributions and the confusion matrix.
    if let Some((missing, _)) = by_class.keys().enumerate().find(|(i, class)| i != *class) {
        return Err(ValidationError::SparseClassLabels {
            column: config.target().to_string(),
            missing,
            max: by_class.keys().next_back().copied().unwrap_or(missing),
        });
    }
    for (&class, rows) in &by_class {
        if rows.len() < 2 {
            return Err(ValidationError::TooFewClassMembers {
                class,
                count: rows.len(),
            });
        }
    }

    let n = labels.len();
    let k = by_class.len();
    // Tolerance keeps 0.2 × 100 at 20 rather than 21.
    let n_test = ((config.test_fraction() * n as f64) - 1e-9).ceil().max(0.0) as usize;
    let n_train = n - n_test;
    if n_test < k {
        return Err(ValidationError::PartitionTooSmall {
            partition: "test",
            size: n_test,
            n_classes: k,
        });
    }
    if n_train < k {
        return Err(ValidationError::PartitionTooSmall {
            partition: "train",
            size: n_train,
            n_classes: k,
        });
    }

    let class_counts: Vec<usize> = by_class.values().map(Vec::len).collect();
    let test_counts = allocate_test_counts(&class_counts, n_test);
    debug!(?class_counts, ?test_counts, "stratified allocation");

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed());
    let mut train_rows = Vec::with_capacity(n_train);
    let mut test_rows = Vec::with_capacity(n_test);
    for (rows, &t) in by_class.into_values().zip(&test_counts) {
        let mut rows = rows;
        rows.shuffle(&mut rng);
        test_rows.extend_from_slice(&rows[..t]);
        train_rows.extend_from_slice(&rows[t..]);
    }
    train_rows.shuffle(&mut rng);
    test_rows.shuffle(&mut rng);

    let gather = |rows: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
        rows.iter().map(|&r| (matrix[r].clone(), labels[r])).unzip()
    };
    let (train_features, train_labels) = gather(&train_rows);
    let (test_features, test_labels) = gather(&test_rows);
    let n_classes = labels.iter().max().map_or(0, |m| m + 1);

    info!(
        n_train = train_rows.len(),
        n_test = test_rows.len(),
        n_features = feature_names.len(),
        n_classes,
        "train/test split complete"
    );
    Ok(SplitData {
        feature_names,
        train_features,
        train_labels,
        test_features,
        test_labels,
        train_rows,
        test_rows,
        n_classes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscope_io::Column;

    fn labelled(labels: &[f64]) -> Table {
        let n = labels.len();
        Table::new(vec![
            Column::numeric("id", (0..n).map(|i| Some(i as f64)).collect()),
            Column::numeric("Age", (0..n).map(|i| Some(18.0 + (i % 10) as f64)).collect()),
            Column::numeric("CGPA", (0..n).map(|i| Some(5.0 + (i % 5) as f64)).collect()),
            Column::numeric("Depression", labels.iter().map(|&v| Some(v)).collect()),
        ])
        .unwrap()
    }

    fn seventy_thirty() -> Table {
        let labels: Vec<f64> = (0..100).map(|i| if i < 70 { 0.0 } else { 1.0 }).collect();
        labelled(&labels)
    }

    #[test]
    fn config_rejects_bad_fraction() {
        for f in [0.0, 1.0, -0.1, f64::NAN] {
            assert!(matches!(
                SplitConfig::new(f),
                Err(ValidationError::InvalidTestFraction { .. })
            ));
        }
    }

    #[test]
    fn candidates_exclude_target_and_ids() {
        let t = Table::new(vec![
            Column::numeric("ID", vec![Some(1.0)]),
            Column::numeric("Index", vec![Some(1.0)]),
            Column::numeric("Age", vec![Some(1.0)]),
            Column::numeric("Depression", vec![Some(1.0)]),
        ])
        .unwrap();
        assert_eq!(candidate_features(&t, "Depression"), vec!["Age"]);
    }

    #[test]
    fn stratified_counts_70_30() {
        let split = split(&seventy_thirty(), &SplitConfig::default()).unwrap();
        assert_eq!(split.test_labels.len(), 20);
        assert_eq!(split.train_labels.len(), 80);
        let positives = split.test_labels.iter().filter(|&&l| l == 1).count();
        assert_eq!(positives, 6);
        assert_eq!(split.feature_names, vec!["Age", "CGPA"]);
        assert_eq!(split.n_classes, 2);
    }

    #[test]
    fn partitions_are_disjoint_and_complete() {
        let split = split(&seventy_thirty(), &SplitConfig::default()).unwrap();
        let mut all: Vec<usize> = split.train_rows.iter().chain(&split.test_rows).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_membership() {
        let config = SplitConfig::new(0.3).unwrap().with_seed(7);
        let a = split(&seventy_thirty(), &config).unwrap();
        let b = split(&seventy_thirty(), &config).unwrap();
        assert_eq!(a, b);
        let c = split(&seventy_thirty(), &config.clone().with_seed(8)).unwrap();
        assert_ne!(a.test_rows, c.test_rows);
    }

    #[test]
    fn explicit_features_keep_order() {
        let config = SplitConfig::new(0.2)
            .unwrap()
            .with_features(FeatureSelection::Columns(vec!["CGPA".into(), "Age".into()]));
        let split = split(&seventy_thirty(), &config).unwrap();
        assert_eq!(split.feature_names, vec!["CGPA", "Age"]);
        let row = split.train_rows[0];
        assert_eq!(split.train_features[0], vec![5.0 + (row % 5) as f64, 18.0 + (row % 10) as f64]);
    }

    #[test]
    fn selection_errors() {
        let t = seventy_thirty();
        let empty = SplitConfig::default().with_features(FeatureSelection::Columns(vec![]));
        assert!(matches!(split(&t, &empty), Err(ValidationError::EmptyFeatureSelection)));

        let unknown = SplitConfig::default().with_features(FeatureSelection::Columns(vec!["id".into()]));
        assert!(matches!(split(&t, &unknown), Err(ValidationError::UnknownFeature { .. })));
    }

    #[test]
    fn target_errors() {
        let t = seventy_thirty();
        let missing = SplitConfig::default().with_target("Outcome");
        assert!(matches!(split(&t, &missing), Err(ValidationError::TargetNotFound { .. })));

        let fractional = labelled(&[0.0, 1.0, 0.5, 1.0]);
        assert!(matches!(
            split(&fractional, &SplitConfig::default()),
            Err(ValidationError::TargetNotClassLabel { row: 2, .. })
        ));
    }

    #[test]
    fn non_numeric_and_missing_features() {
        let t = Table::new(vec![
            Column::categorical("City", vec![Some("a".into()), Some("b".into())]),
            Column::numeric("Age", vec![Some(1.0), None]),
            Column::numeric("Depression", vec![Some(0.0), Some(1.0)]),
        ])
        .unwrap();
        assert!(matches!(
            feature_matrix(&t, &["City".to_string()]),
            Err(ValidationError::NonNumericFeature { .. })
        ));
        assert!(matches!(
            feature_matrix(&t, &["Age".to_string()]),
            Err(ValidationError::MissingFeatureValue { row: 1, .. })
        ));
    }

    #[test]
    fn singleton_class_rejected() {
        let t = labelled(&[0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            split(&t, &SplitConfig::default()),
            Err(ValidationError::TooFewClassMembers { class: 1, count: 1 })
        ));
    }

    #[test]
    fn labels_with_gaps_rejected() {
        let t = labelled(&[0.0, 0.0, 1.0, 1.0, 1_000_000.0, 1_000_000.0]);
        assert!(matches!(
            split(&t, &SplitConfig::default()),
            Err(ValidationError::SparseClassLabels { missing: 2, max: 1_000_000, .. })
        ));

        let no_zero = labelled(&[1.0, 1.0, 2.0, 2.0, 1.0, 2.0]);
        assert!(matches!(
            split(&no_zero, &SplitConfig::default()),
            Err(ValidationError::SparseClassLabels { missing: 0, max: 2, .. })
        ));
    }

    #[test]
    fn tiny_test_partition_rejected() {
        let t = labelled(&[0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
        let config = SplitConfig::new(0.1).unwrap();
        assert!(matches!(
            split(&t, &config),
            Err(ValidationError::PartitionTooSmall { partition: "test", size: 1, n_classes: 2 })
        ));
    }

    #[test]
    fn allocation_keeps_one_per_partition() {
        assert_eq!(allocate_test_counts(&[98, 2], 10), vec![9, 1]);
        assert_eq!(allocate_test_counts(&[3, 3, 6], 6), vec![2, 1, 3]);
        assert_eq!(allocate_test_counts(&[70, 30], 20), vec![14, 6]);
    }
}
