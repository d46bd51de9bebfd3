//! Missing-value handling: row dropping and per-column imputation.

use std::collections::HashMap;

use depscope_io::{Column, ColumnData, Table};
use tracing::{debug, warn};

use crate::config::MissingStrategy;
use crate::error::PrepError;

/// Fill used for categorical columns with no observed value.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Replacement for the missing markers of one column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillValue {
    /// Numeric replacement.
    Number(f64),
    /// Categorical replacement.
    Text(String),
}

/// Missing-value handling fitted on a table, replayable on new tables.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FittedMissing {
    /// Drop rows containing any marker.
    DropRows,
    /// Per-column fill values, keyed by column name.
    Fill(HashMap<String, FillValue>),
    /// Replace every marker with zero.
    Zero,
}

/// Outcome counts from one missing-value pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissingCounts {
    /// Rows removed by [`MissingStrategy::DropRows`].
    pub rows_dropped: usize,
    /// Markers replaced by a fill value.
    pub cells_filled: usize,
}

/// Fit `strategy` on `table`.
///
/// Mean and median apply to numeric columns; categorical columns take their
/// most frequent value (ties go to the value seen first). A numeric column
/// with no observed values falls back to `0.0`.
#[must_use]
pub fn fit(table: &Table, strategy: MissingStrategy) -> FittedMissing {
    match strategy {
        MissingStrategy::DropRows => FittedMissing::DropRows,
        MissingStrategy::Zero => FittedMissing::Zero,
        MissingStrategy::Mean | MissingStrategy::Median => {
            let fills = table
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), column_fill(c, strategy)))
                .collect();
            FittedMissing::Fill(fills)
        }
    }
}

fn column_fill(column: &Column, strategy: MissingStrategy) -> FillValue {
    match column.data() {
        ColumnData::Numeric(cells) => {
            let mut observed: Vec<f64> = cells.iter().flatten().copied().collect();
            let fill = match strategy {
                MissingStrategy::Median => median(&mut observed),
                _ => mean(&observed),
            };
            FillValue::Number(fill.unwrap_or_else(|| {
                warn!(column = column.name(), "numeric column has no observed values; filling with 0");
                0.0
            }))
        }
        ColumnData::Categorical(cells) => FillValue::Text(
            mode(cells).map_or_else(|| UNKNOWN_CATEGORY.to_string(), str::to_string),
        ),
    }
}

/// Arithmetic mean, or `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median (average of the two middle values for even lengths). Sorts `values`.
#[must_use]
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Most frequent non-missing value; ties go to the first encountered.
#[must_use]
pub fn mode(cells: &[Option<String>]) -> Option<&str> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, cell) in cells.iter().enumerate() {
        if let Some(s) = cell.as_deref() {
            counts.entry(s).or_insert((0, pos)).0 += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, pa)), (_, (cb, pb))| ca.cmp(cb).then(pb.cmp(pa)))
        .map(|(value, _)| value)
}

impl FittedMissing {
    /// Apply the fitted handling to `table`.
    ///
    /// Columns unknown at fit time are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Table`] if the rebuilt columns do not form a valid table.
    pub fn apply(&self, table: &Table) -> Result<(Table, MissingCounts), PrepError> {
        match self {
            FittedMissing::DropRows => {
                let keep: Vec<usize> = (0..table.n_rows())
                    .filter(|&row| !table.row_has_missing(row))
                    .collect();
                let counts = MissingCounts {
                    rows_dropped: table.n_rows() - keep.len(),
                    cells_filled: 0,
                };
                debug!(rows_dropped = counts.rows_dropped, "dropped rows with missing values");
                Ok((table.take_rows(&keep), counts))
            }
            FittedMissing::Zero => {
                let cells_filled = table.missing_count();
                let columns: Vec<Column> = table
                    .columns()
                    .iter()
                    .map(|c| {
                        let fill = match c.data() {
                            ColumnData::Numeric(_) => FillValue::Number(0.0),
                            ColumnData::Categorical(_) => FillValue::Text("0".to_string()),
                        };
                        fill_column(c, &fill)
                    })
                    .collect();
                Ok((
                    Table::new(columns)?,
                    MissingCounts {
                        rows_dropped: 0,
                        cells_filled,
                    },
                ))
            }
            FittedMissing::Fill(fills) => {
                let mut cells_filled = 0;
                let columns: Vec<Column> = table
                    .columns()
                    .iter()
                    .map(|c| match fills.get(c.name()) {
                        Some(fill) => {
                            cells_filled += c.missing_count();
                            fill_column(c, fill)
                        }
                        None => c.clone(),
                    })
                    .collect();
                Ok((
                    Table::new(columns)?,
                    MissingCounts {
                        rows_dropped: 0,
                        cells_filled,
                    },
                ))
            }
        }
    }
}

/// Replace markers in `column` with `fill`. A fill of the other kind is
/// converted: numbers are written as text, text that parses stays numeric.
fn fill_column(column: &Column, fill: &FillValue) -> Column {
    let data = match (column.data(), fill) {
        (ColumnData::Numeric(cells), FillValue::Number(v)) => {
            ColumnData::Numeric(cells.iter().map(|c| Some(c.unwrap_or(*v))).collect())
        }
        (ColumnData::Numeric(cells), FillValue::Text(s)) => match s.trim().parse::<f64>() {
            Ok(v) => ColumnData::Numeric(cells.iter().map(|c| Some(c.unwrap_or(v))).collect()),
            Err(_) => ColumnData::Categorical(
                cells
                    .iter()
                    .map(|c| Some(c.map_or_else(|| s.clone(), |n| n.to_string())))
                    .collect(),
            ),
        },
        (ColumnData::Categorical(cells), FillValue::Text(s)) => ColumnData::Categorical(
            cells.iter().map(|c| Some(c.clone().unwrap_or_else(|| s.clone()))).collect(),
        ),
        (ColumnData::Categorical(cells), FillValue::Number(v)) => ColumnData::Categorical(
            cells
                .iter()
                .map(|c| Some(c.clone().unwrap_or_else(|| v.to_string())))
                .collect(),
        ),
    };
    Column::from_data(column.name(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscope_io::Value;

    fn sample() -> Table {
        Table::new(vec![
            Column::numeric("Age", vec![Some(20.0), None, Some(30.0), Some(40.0)]),
            Column::categorical(
                "City",
                vec![Some("Pune".into()), Some("Delhi".into()), None, Some("Delhi".into())],
            ),
            Column::numeric("CGPA", vec![Some(8.0), Some(7.0), Some(6.0), Some(5.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn drop_rows_keeps_order() {
        let (out, counts) = fit(&sample(), MissingStrategy::DropRows).apply(&sample()).unwrap();
        assert_eq!(out.n_rows(), 2);
        assert_eq!(counts.rows_dropped, 2);
        assert_eq!(out.column("CGPA").unwrap().value(1), Value::Number(5.0));
        assert_eq!(out.missing_count(), 0);
    }

    #[test]
    fn mean_fills_numeric_and_mode_fills_categorical() {
        let (out, counts) = fit(&sample(), MissingStrategy::Mean).apply(&sample()).unwrap();
        assert_eq!(out.missing_count(), 0);
        assert_eq!(counts.cells_filled, 2);
        assert_eq!(out.column("Age").unwrap().value(1), Value::Number(30.0));
        assert_eq!(out.column("City").unwrap().value(2), Value::Text("Delhi"));
    }

    #[test]
    fn median_of_even_count_averages_middle() {
        let t = Table::new(vec![Column::numeric(
            "x",
            vec![Some(1.0), Some(10.0), None, Some(2.0), Some(3.0)],
        )])
        .unwrap();
        let (out, _) = fit(&t, MissingStrategy::Median).apply(&t).unwrap();
        assert_eq!(out.column("x").unwrap().value(2), Value::Number(2.5));
    }

    #[test]
    fn zero_fill_both_kinds() {
        let (out, counts) = fit(&sample(), MissingStrategy::Zero).apply(&sample()).unwrap();
        assert_eq!(counts.cells_filled, 2);
        assert_eq!(out.column("Age").unwrap().value(1), Value::Number(0.0));
        assert_eq!(out.column("City").unwrap().value(2), Value::Text("0"));
    }

    #[test]
    fn mode_tie_goes_to_first_seen() {
        let cells = vec![Some("b".to_string()), Some("a".into()), Some("a".into()), Some("b".into())];
        assert_eq!(mode(&cells), Some("b"));
        assert_eq!(mode(&[None, None]), None);
    }

    #[test]
    fn fully_missing_columns_get_fallbacks() {
        let t = Table::new(vec![
            Column::numeric("n", vec![None, None]),
            Column::categorical("c", vec![None, None]),
        ])
        .unwrap();
        let (out, _) = fit(&t, MissingStrategy::Mean).apply(&t).unwrap();
        assert_eq!(out.column("n").unwrap().value(0), Value::Number(0.0));
        assert_eq!(out.column("c").unwrap().value(1), Value::Text(UNKNOWN_CATEGORY));
    }

    #[test]
    fn fitted_fill_replays_on_new_rows() {
        let fitted = fit(&sample(), MissingStrategy::Mean);
        let fresh = Table::new(vec![
            Column::numeric("Age", vec![None]),
            Column::categorical("City", vec![None]),
            Column::numeric("CGPA", vec![None]),
        ])
        .unwrap();
        let (out, counts) = fitted.apply(&fresh).unwrap();
        assert_eq!(out.column("Age").unwrap().value(0), Value::Number(30.0));
        assert_eq!(out.column("CGPA").unwrap().value(0), Value::Number(6.5));
        assert_eq!(out.missing_count(), 0);
        assert_eq!(counts.cells_filled, 3);
    }
}
