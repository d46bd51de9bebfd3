//! Integration tests: survey CSV text -> preprocess -> stratified split.

use depscope_io::{ColumnKind, Table, TableReader};
use depscope_prep::{
    MissingStrategy, PreprocessConfig, SplitConfig, ValidationError, preprocess, profile, split,
};

const SLEEP: [&str; 5] = [
    "'Less than 5 hours'",
    "'5-6 hours'",
    "'7-8 hours'",
    "'More than 8 hours'",
    "Others",
];
const CITIES: [&str; 4] = ["Pune", "Thane", "Nagpur", "Jaipur"];

/// 100 survey rows, 72 negative and 28 positive. Every 9th row has a blank
/// Age, every 13th a `?` Financial Stress, and the last two rows repeat
/// rows 0 and 1 except for their id.
fn survey_csv() -> String {
    let mut out = String::from(
        "id,Gender,Age,City,CGPA,Sleep Duration,Financial Stress,Depression\n",
    );
    for i in 0..100usize {
        let source = if i >= 98 { i - 98 } else { i };
        let gender = if source % 2 == 0 { "Male" } else { "Female" };
        let age = if source % 9 == 4 {
            String::new()
        } else {
            format!("{}.0", 18 + source % 12)
        };
        let stress = if source % 13 == 5 {
            "?".to_string()
        } else {
            format!("{}.0", 1 + source % 5)
        };
        let label = if source < 70 { 0 } else { 1 };
        out.push_str(&format!(
            "{},{gender},{age},{},{:.2},{},{stress},{label}\n",
            i + 1,
            CITIES[source % CITIES.len()],
            5.0 + (source % 50) as f64 / 10.0,
            SLEEP[source % SLEEP.len()],
        ));
    }
    out
}

fn load() -> Table {
    TableReader::new()
        .read(survey_csv().as_bytes(), "<survey>")
        .expect("synthetic survey should parse")
}

fn full_config() -> PreprocessConfig {
    PreprocessConfig::new()
        .with_missing(Some(MissingStrategy::Median))
        .with_remove_duplicates(true)
        .with_encode_categorical(true)
}

#[test]
fn raw_table_cannot_be_split() {
    let err = split(&load(), &SplitConfig::default()).unwrap_err();
    assert!(matches!(err, ValidationError::NonNumericFeature { .. }));
}

#[test]
fn processed_table_is_numeric_and_complete() {
    let out = preprocess(&load(), &full_config()).unwrap();
    assert_eq!(out.report.rows_before, 100);
    assert_eq!(out.report.missing_after, 0);
    assert!(out.report.cells_filled > 0);
    assert!(
        out.table
            .columns()
            .iter()
            .all(|c| c.kind() == ColumnKind::Numeric)
    );
    let stress = out.table.column("Financial Stress").unwrap().as_numeric().unwrap();
    assert!(stress.iter().flatten().all(|v| v.fract() == 0.0));
}

#[test]
fn ids_keep_near_duplicates_distinct() {
    // The id column differs, so no row is an exact duplicate.
    let out = preprocess(&load(), &full_config()).unwrap();
    assert_eq!(out.report.duplicates_removed, 0);
}

#[test]
fn twenty_percent_split_is_stratified_and_reproducible() {
    let out = preprocess(&load(), &full_config()).unwrap();
    let config = SplitConfig::new(0.2).unwrap().with_seed(42);
    let first = split(&out.table, &config).unwrap();

    assert_eq!(first.test_labels.len(), 20);
    let positives = first.test_labels.iter().filter(|&&l| l == 1).count();
    assert!((5..=7).contains(&positives), "positives in test: {positives}");
    assert!(!first.feature_names.iter().any(|n| n == "id" || n == "Depression"));

    let second = split(&out.table, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn drop_rows_output_is_ordered_subset() {
    let input = load();
    let config = PreprocessConfig::new().with_missing(Some(MissingStrategy::DropRows));
    let out = preprocess(&input, &config).unwrap();
    assert_eq!(out.table.missing_count(), 0);

    let ids = |t: &Table| -> Vec<f64> {
        t.column("id").unwrap().as_numeric().unwrap().iter().flatten().copied().collect()
    };
    let kept = ids(&out.table);
    let all = ids(&input);
    assert!(kept.windows(2).all(|w| w[0] < w[1]));
    assert!(kept.iter().all(|id| all.contains(id)));
    assert_eq!(kept.len() + out.report.rows_dropped, all.len());
}

#[test]
fn duplicate_removal_is_idempotent_after_dropping_ids() {
    let input = load();
    let columns: Vec<_> = input.columns().iter().filter(|c| c.name() != "id").cloned().collect();
    let without_ids = Table::new(columns).unwrap();

    let config = PreprocessConfig::new().with_remove_duplicates(true);
    let once = preprocess(&without_ids, &config).unwrap();
    assert_eq!(once.report.duplicates_removed, 2);
    let twice = preprocess(&once.table, &config).unwrap();
    assert_eq!(twice.report.duplicates_removed, 0);
    assert_eq!(twice.table, once.table);
}

#[test]
fn profile_reports_raw_shape() {
    let p = profile(&load(), "Depression", 3);
    assert_eq!(p.n_rows, 100);
    assert_eq!(p.n_columns, 8);
    let dist = p.target_distribution.unwrap();
    assert_eq!(dist.iter().map(|v| v.count).sum::<usize>(), 100);
    assert!(p.category_counts.iter().all(|c| c.counts.len() <= 3));
}
