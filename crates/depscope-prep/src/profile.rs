//! Dataset profile: shape, missing values, per-column summaries, target
//! distribution, and the numbers the exploratory charts are drawn from.

use std::collections::{BTreeMap, HashMap};

use depscope_io::{Column, ColumnData, ColumnKind, Table, Value};
use tracing::{debug, instrument};

use crate::missing::mean;

/// Default number of value counts kept per categorical column.
pub const DEFAULT_TOP_VALUES: usize = 10;

/// Per-column overview.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Storage type.
    pub kind: ColumnKind,
    /// Missing markers in the column.
    pub n_missing: usize,
    /// Distinct non-missing values.
    pub n_unique: usize,
}

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NumericSummary {
    /// Column name.
    pub name: String,
    /// Non-missing values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (`n - 1` denominator); `NaN` below two values.
    pub std: f64,
    /// Minimum.
    pub min: f64,
    /// First quartile.
    pub q25: f64,
    /// Median.
    pub q50: f64,
    /// Third quartile.
    pub q75: f64,
    /// Maximum.
    pub max: f64,
}

/// Occurrences of one value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValueCount {
    /// The value as text.
    pub value: String,
    /// Occurrences.
    pub count: usize,
}

/// Most frequent values of one categorical column.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CategoryCounts {
    /// Column name.
    pub column: String,
    /// Counts in descending order; ties keep first-appearance order.
    pub counts: Vec<ValueCount>,
}

/// Pearson correlation of one numeric column with the target.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TargetCorrelation {
    /// Column name.
    pub column: String,
    /// Correlation coefficient over rows where both values are present.
    pub correlation: f64,
}

/// Target class shares among the rows holding one category.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CategoryTargetRate {
    /// The category.
    pub value: String,
    /// Rows with this category and a present target.
    pub count: usize,
    /// Percent of those rows in each class, aligned with
    /// [`CategoryTargetRates::classes`]; each row sums to 100.
    pub percent: Vec<f64>,
}

/// Cross-tabulation of one categorical column against the target,
/// normalized per category.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CategoryTargetRates {
    /// Column name.
    pub column: String,
    /// Target classes, in the order of [`DatasetProfile::target_distribution`].
    pub classes: Vec<String>,
    /// One entry per category, sorted by value.
    pub rates: Vec<CategoryTargetRate>,
}

/// A read-only overview of a table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DatasetProfile {
    /// Rows in the table.
    pub n_rows: usize,
    /// Columns in the table.
    pub n_columns: usize,
    /// Missing markers across all cells.
    pub n_missing: usize,
    /// Rows that repeat an earlier row.
    pub n_duplicates: usize,
    /// One entry per column, in table order.
    pub columns: Vec<ColumnInfo>,
    /// Class counts of the target, ascending by value; `None` if the target is absent.
    pub target_distribution: Option<Vec<ValueCount>>,
    /// Statistics for each numeric column.
    pub numeric_summary: Vec<NumericSummary>,
    /// Correlations with the target, strongest positive first.
    pub target_correlations: Vec<TargetCorrelation>,
    /// Top value counts for each categorical column.
    pub category_counts: Vec<CategoryCounts>,
    /// Per-category target rates for each categorical column other than
    /// the target; empty if the target is absent.
    pub category_target_rates: Vec<CategoryTargetRates>,
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Summarize the non-missing values of a numeric column.
#[must_use]
pub fn summarize(name: &str, cells: &[Option<f64>]) -> Option<NumericSummary> {
    let mut values: Vec<f64> = cells.iter().flatten().copied().collect();
    let mean = mean(&values)?;
    values.sort_by(f64::total_cmp);
    let n = values.len();
    let std = if n < 2 {
        f64::NAN
    } else {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    };
    Some(NumericSummary {
        name: name.to_string(),
        count: n,
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        q50: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[n - 1],
    })
}

/// Pearson correlation over pairwise-complete rows.
///
/// Returns `None` with fewer than two complete pairs or zero variance.
#[must_use]
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Value counts in descending order, ties by first appearance, truncated to `top`.
#[must_use]
pub fn value_counts<'a>(values: impl Iterator<Item = Option<&'a str>>, top: usize) -> Vec<ValueCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<ValueCount> = Vec::new();
    for value in values.flatten() {
        match index.get(value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value, counts.len());
                counts.push(ValueCount {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }
    // Stable sort keeps first-appearance order among ties.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(top);
    counts
}

fn target_distribution(table: &Table, target: &str) -> Option<Vec<ValueCount>> {
    let column = table.column(target)?;
    let mut counts = match column.data() {
        ColumnData::Numeric(cells) => {
            let mut by_value: Vec<(f64, usize)> = Vec::new();
            for v in cells.iter().flatten() {
                match by_value.iter_mut().find(|(x, _)| x == v) {
                    Some((_, c)) => *c += 1,
                    None => by_value.push((*v, 1)),
                }
            }
            by_value.sort_by(|a, b| a.0.total_cmp(&b.0));
            by_value
                .into_iter()
                .map(|(value, count)| ValueCount {
                    value: value.to_string(),
                    count,
                })
                .collect()
        }
        ColumnData::Categorical(cells) => value_counts(cells.iter().map(|c| c.as_deref()), usize::MAX),
    };
    if column.kind() == ColumnKind::Categorical {
        counts.sort_by(|a, b| a.value.cmp(&b.value));
    }
    Some(counts)
}

/// Target cell as a class key, matching the text of the target distribution.
fn target_key(column: &Column, row: usize) -> Option<String> {
    match column.value(row) {
        Value::Missing => None,
        Value::Number(v) => Some(v.to_string()),
        Value::Text(t) => Some(t.to_string()),
    }
}

/// Rows where either side is missing are left out.
#[must_use]
pub fn category_target_rates(
    column: &Column,
    target: &Column,
    classes: &[String],
) -> Option<CategoryTargetRates> {
    let cells = column.as_categorical()?;
    let mut tallies: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, cell) in cells.iter().enumerate() {
        let (Some(value), Some(class)) = (cell.as_deref(), target_key(target, row)) else {
            continue;
        };
        let Some(idx) = classes.iter().position(|c| *c == class) else {
            continue;
        };
        tallies.entry(value).or_insert_with(|| vec![0; classes.len()])[idx] += 1;
    }
    let rates = tallies
        .into_iter()
        .map(|(value, counts)| {
            let count: usize = counts.iter().sum();
            CategoryTargetRate {
                value: value.to_string(),
                count,
                percent: counts.iter().map(|&c| 100.0 * c as f64 / count as f64).collect(),
            }
        })
        .collect();
    Some(CategoryTargetRates {
        column: column.name().to_string(),
        classes: classes.to_vec(),
        rates,
    })
}

/// Compute the profile of `table`.
///
/// `target` names the class column used for the distribution and the
/// correlations; `top` bounds each categorical value-count list.
#[must_use]
#[instrument(skip_all, fields(n_rows = table.n_rows(), n_columns = table.n_columns()))]
pub fn profile(table: &Table, target: &str, top: usize) -> DatasetProfile {
    let columns: Vec<ColumnInfo> = table
        .columns()
        .iter()
        .map(|c| ColumnInfo {
            name: c.name().to_string(),
            kind: c.kind(),
            n_missing: c.missing_count(),
            n_unique: c.unique_count(),
        })
        .collect();

    let numeric_summary: Vec<NumericSummary> = table
        .columns()
        .iter()
        .filter_map(|c| summarize(c.name(), c.as_numeric()?))
        .collect();

    let mut target_correlations: Vec<TargetCorrelation> = Vec::new();
    if let Some(target_cells) = table.column(target).and_then(|c| c.as_numeric()) {
        for column in table.columns() {
            if let Some(cells) = column.as_numeric()
                && let Some(correlation) = pearson(cells, target_cells)
            {
                target_correlations.push(TargetCorrelation {
                    column: column.name().to_string(),
                    correlation,
                });
            }
        }
        target_correlations.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    }

    let category_counts: Vec<CategoryCounts> = table
        .columns()
        .iter()
        .filter_map(|c| {
            let cells = c.as_categorical()?;
            Some(CategoryCounts {
                column: c.name().to_string(),
                counts: value_counts(cells.iter().map(|v| v.as_deref()), top),
            })
        })
        .collect();

    let target_distribution = target_distribution(table, target);
    let category_target_rates: Vec<CategoryTargetRates> = match (table.column(target), &target_distribution) {
        (Some(target_column), Some(dist)) => {
            let classes: Vec<String> = dist.iter().map(|c| c.value.clone()).collect();
            table
                .columns()
                .iter()
                .filter(|c| c.name() != target)
                .filter_map(|c| category_target_rates(c, target_column, &classes))
                .collect()
        }
        _ => Vec::new(),
    };

    let profile = DatasetProfile {
        n_rows: table.n_rows(),
        n_columns: table.n_columns(),
        n_missing: table.missing_count(),
        n_duplicates: table.duplicate_count(),
        columns,
        target_distribution,
        numeric_summary,
        target_correlations,
        category_counts,
        category_target_rates,
    };
    debug!(
        n_missing = profile.n_missing,
        n_duplicates = profile.n_duplicates,
        n_numeric = profile.numeric_summary.len(),
        "profile computed"
    );
    profile
}
