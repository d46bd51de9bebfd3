//! The preprocessing pipeline: missing values → duplicates → encoding.

use depscope_io::Table;
use tracing::{info, instrument, warn};

use crate::config::{MissingStrategy, PreprocessConfig};
use crate::dedup::remove_duplicates;
use crate::encode::EncodingState;
use crate::error::PrepError;
use crate::missing::{self, FittedMissing};

/// Summary of one preprocessing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PreprocessReport {
    /// Rows in the input table.
    pub rows_before: usize,
    /// Rows in the output table.
    pub rows_after: usize,
    /// Missing markers in the input table.
    pub missing_before: usize,
    /// Missing markers in the output table.
    pub missing_after: usize,
    /// Rows removed by the drop-rows strategy.
    pub rows_dropped: usize,
    /// Markers replaced by imputation or zero-fill.
    pub cells_filled: usize,
    /// Rows removed as exact duplicates.
    pub duplicates_removed: usize,
    /// Columns converted to numbers by the encoding step.
    pub encoded_columns: Vec<String>,
}

/// Transforms learned during preprocessing, replayable on new rows.
///
/// Duplicate removal and row dropping are not replayed: scoring keeps every
/// input row, and markers left after missing-value handling stay markers.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FittedPreprocessor {
    missing: Option<FittedMissing>,
    encoding: Option<EncodingState>,
}

impl FittedPreprocessor {
    /// Fitted missing-value handling, if that step ran.
    #[must_use]
    pub fn missing(&self) -> Option<&FittedMissing> {
        self.missing.as_ref()
    }

    /// Fitted encoding, if that step ran.
    #[must_use]
    pub fn encoding(&self) -> Option<&EncodingState> {
        self.encoding.as_ref()
    }

    /// Replay imputation and encoding on `table`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Table`] if a rebuilt column breaks table invariants.
    #[instrument(skip_all, fields(n_rows = table.n_rows()))]
    pub fn transform(&self, table: &Table) -> Result<Table, PrepError> {
        let mut out = match &self.missing {
            Some(FittedMissing::DropRows) | None => table.clone(),
            Some(fitted) => fitted.apply(table)?.0,
        };
        if let Some(encoding) = &self.encoding {
            out = encoding.apply(&out)?;
        }
        Ok(out)
    }
}

/// Output of [`preprocess`].
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    /// The processed table.
    pub table: Table,
    /// Counts describing what each step did.
    pub report: PreprocessReport,
    /// Replayable transforms.
    pub fitted: FittedPreprocessor,
}

/// Run the enabled steps of `config` over `table`.
///
/// The input is never modified. With every step disabled the output equals
/// the input.
///
/// # Errors
///
/// Returns [`PrepError::Table`] if a rebuilt column breaks table invariants.
#[instrument(skip_all, fields(n_rows = table.n_rows(), n_steps = config.step_count()))]
pub fn preprocess(table: &Table, config: &PreprocessConfig) -> Result<PreprocessOutput, PrepError> {
    let mut report = PreprocessReport {
        rows_before: table.n_rows(),
        missing_before: table.missing_count(),
        ..PreprocessReport::default()
    };
    if config.step_count() == 0 {
        warn!("no preprocessing steps selected; table passes through unchanged");
    }

    let mut fitted = FittedPreprocessor::default();
    let mut current = table.clone();

    if let Some(strategy) = config.missing() {
        let handling = missing::fit(&current, strategy);
        let (next, counts) = handling.apply(&current)?;
        report.rows_dropped = counts.rows_dropped;
        report.cells_filled = counts.cells_filled;
        if strategy == MissingStrategy::DropRows && next.n_rows() == 0 {
            warn!("every row had a missing value; table is now empty");
        }
        fitted.missing = Some(handling);
        current = next;
    }

    if config.remove_duplicates() {
        let (next, removed) = remove_duplicates(&current);
        report.duplicates_removed = removed;
        current = next;
    }

    if config.encode_categorical() {
        let (next, state) = EncodingState::fit_transform(&current, config)?;
        report.encoded_columns = state.encoded_columns();
        fitted.encoding = Some(state);
        current = next;
    }

    report.rows_after = current.n_rows();
    report.missing_after = current.missing_count();
    info!(
        rows_before = report.rows_before,
        rows_after = report.rows_after,
        missing_after = report.missing_after,
        duplicates_removed = report.duplicates_removed,
        n_encoded = report.encoded_columns.len(),
        "preprocessing complete"
    );
    Ok(PreprocessOutput {
        table: current,
        report,
        fitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscope_io::{Column, ColumnKind, Value};

    fn survey() -> Table {
        Table::new(vec![
            Column::numeric("id", vec![Some(1.0), Some(2.0), Some(2.0), Some(4.0)]),
            Column::categorical(
                "Gender",
                vec![Some("Male".into()), None, None, Some("Female".into())],
            ),
            Column::numeric("Age", vec![Some(20.0), Some(24.0), Some(24.0), None]),
            Column::categorical(
                "Sleep Duration",
                vec![
                    Some("'5-6 hours'".into()),
                    Some("Others".into()),
                    Some("Others".into()),
                    Some("7-8 hours".into()),
                ],
            ),
            Column::numeric("Depression", vec![Some(1.0), Some(0.0), Some(0.0), Some(1.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn no_steps_is_identity() {
        let out = preprocess(&survey(), &PreprocessConfig::new()).unwrap();
        assert_eq!(out.table, survey());
        assert_eq!(out.report.rows_before, out.report.rows_after);
        assert_eq!(out.fitted, FittedPreprocessor::default());
    }

    #[test]
    fn full_pipeline() {
        let config = PreprocessConfig::new()
            .with_missing(Some(MissingStrategy::Median))
            .with_remove_duplicates(true)
            .with_encode_categorical(true);
        let out = preprocess(&survey(), &config).unwrap();

        assert_eq!(out.report.cells_filled, 3);
        assert_eq!(out.report.duplicates_removed, 1);
        assert_eq!(out.report.rows_after, 3);
        assert_eq!(out.report.missing_after, 0);
        assert_eq!(out.report.encoded_columns, vec!["Sleep Duration", "Gender"]);
        assert!(
            out.table
                .columns()
                .iter()
                .all(|c| c.kind() == ColumnKind::Numeric)
        );
        assert_eq!(out.table.column("Sleep Duration").unwrap().value(0), Value::Number(5.5));
    }

    #[test]
    fn drop_rows_reports_counts() {
        let config = PreprocessConfig::new().with_missing(Some(MissingStrategy::DropRows));
        let out = preprocess(&survey(), &config).unwrap();
        assert_eq!(out.report.rows_dropped, 3);
        assert_eq!(out.table.n_rows(), 1);
        assert_eq!(out.report.missing_after, 0);
    }

    #[test]
    fn input_is_untouched() {
        let input = survey();
        let config = PreprocessConfig::new().with_missing(Some(MissingStrategy::Zero));
        let _ = preprocess(&input, &config).unwrap();
        assert_eq!(input, survey());
    }

    #[test]
    fn fitted_transform_replays_fill_and_encoding() {
        let config = PreprocessConfig::new()
            .with_missing(Some(MissingStrategy::Mean))
            .with_encode_categorical(true);
        let out = preprocess(&survey(), &config).unwrap();
        let fresh = Table::new(vec![
            Column::numeric("id", vec![Some(9.0)]),
            Column::categorical("Gender", vec![Some("Female".into())]),
            Column::numeric("Age", vec![None]),
            Column::categorical("Sleep Duration", vec![Some("More than 8 hours".into())]),
            Column::numeric("Depression", vec![Some(0.0)]),
        ])
        .unwrap();
        let scored = out.fitted.transform(&fresh).unwrap();
        assert_eq!(
            scored.row(0),
            vec![
                Value::Number(9.0),
                Value::Number(0.0),
                Value::Number(68.0 / 3.0),
                Value::Number(9.0),
                Value::Number(0.0),
            ]
        );
    }
}
