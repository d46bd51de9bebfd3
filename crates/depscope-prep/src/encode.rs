//! Categorical encoding: domain mappings for sleep duration and financial
//! stress, then label encoding for every other categorical column.

use std::collections::BTreeSet;

use depscope_io::{Column, ColumnData, Table};
use tracing::{debug, instrument};

use crate::config::PreprocessConfig;
use crate::error::PrepError;

/// Sleep-duration buckets and their representative hours.
pub const SLEEP_BUCKETS: [(&str, f64); 5] = [
    ("Less than 5 hours", 4.0),
    ("5-6 hours", 5.5),
    ("7-8 hours", 7.5),
    ("More than 8 hours", 9.0),
    ("Others", 6.0),
];

/// Hours assigned to unrecognized or missing sleep durations.
pub const SLEEP_DEFAULT: f64 = 6.0;

/// Level assigned to non-numeric or missing financial stress.
pub const FINANCIAL_STRESS_DEFAULT: f64 = 3.0;

/// Text a missing marker is encoded as.
pub const MISSING_CATEGORY: &str = "nan";

/// Map a sleep-duration label to hours.
///
/// One surrounding pair of single quotes is stripped first, so `'5-6 hours'`
/// and `5-6 hours` map alike.
#[must_use]
pub fn sleep_hours(label: Option<&str>) -> f64 {
    let Some(label) = label else {
        return SLEEP_DEFAULT;
    };
    let label = label
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(label);
    SLEEP_BUCKETS
        .iter()
        .find(|(bucket, _)| *bucket == label)
        .map_or(SLEEP_DEFAULT, |(_, hours)| *hours)
}

/// Coerce one financial-stress cell to an integer level.
///
/// Non-numeric and missing cells become [`FINANCIAL_STRESS_DEFAULT`]; numbers
/// are truncated toward zero.
#[must_use]
pub fn financial_stress_level(value: Option<f64>) -> f64 {
    value
        .filter(|v| v.is_finite())
        .unwrap_or(FINANCIAL_STRESS_DEFAULT)
        .trunc()
}

fn sleep_column(column: &Column) -> Column {
    let values = match column.data() {
        ColumnData::Categorical(cells) => cells.iter().map(|c| Some(sleep_hours(c.as_deref()))).collect(),
        // No bucket label is numeric.
        ColumnData::Numeric(cells) => vec![Some(SLEEP_DEFAULT); cells.len()],
    };
    Column::numeric(column.name(), values)
}

fn financial_stress_column(column: &Column) -> Column {
    let values = match column.data() {
        ColumnData::Categorical(cells) => cells
            .iter()
            .map(|c| {
                let parsed = c.as_deref().and_then(|s| s.trim().parse::<f64>().ok());
                Some(financial_stress_level(parsed))
            })
            .collect(),
        ColumnData::Numeric(cells) => cells.iter().map(|c| Some(financial_stress_level(*c))).collect(),
    };
    Column::numeric(column.name(), values)
}

/// Text of a number as a category: integral values keep one decimal
/// (`12.0`), everything else uses the shortest round-trip form.
#[must_use]
pub fn number_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Cell text as seen by the label encoder.
fn category_text(column: &Column, row: usize) -> String {
    match column.data() {
        ColumnData::Categorical(cells) => cells[row].clone().unwrap_or_else(|| MISSING_CATEGORY.to_string()),
        ColumnData::Numeric(cells) => cells[row].map_or_else(|| MISSING_CATEGORY.to_string(), number_text),
    }
}

/// Maps the sorted distinct categories of one column to codes `0..k`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Learn the categories of `column`. Missing markers count as `"nan"`.
    #[must_use]
    pub fn fit(column: &Column) -> Self {
        let classes: BTreeSet<String> = (0..column.len()).map(|row| category_text(column, row)).collect();
        Self {
            column: column.name().to_string(),
            classes: classes.into_iter().collect(),
        }
    }

    /// Name of the encoded column.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Learned categories in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code for `category`. Categories not seen during fitting get the
    /// reserved code `k`, one past the last learned code.
    #[must_use]
    pub fn code(&self, category: &str) -> usize {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(category))
            .unwrap_or(self.classes.len())
    }

    /// Code for a numeric cell: the first learned category that parses to the
    /// same number, else the code of its text.
    #[must_use]
    pub fn code_for_number(&self, value: f64) -> usize {
        self.classes
            .iter()
            .position(|c| c.trim().parse::<f64>().ok() == Some(value))
            .unwrap_or_else(|| self.code(&number_text(value)))
    }

    /// Encode every cell of `column`.
    ///
    /// Numeric cells match learned categories by value, so `12` fitted as
    /// text still encodes a `12.0` read back as a number.
    #[must_use]
    pub fn transform(&self, column: &Column) -> Column {
        let values = match column.data() {
            ColumnData::Numeric(cells) => cells
                .iter()
                .map(|cell| {
                    let code = match cell {
                        Some(v) => self.code_for_number(*v),
                        None => self.code(MISSING_CATEGORY),
                    };
                    Some(code as f64)
                })
                .collect(),
            ColumnData::Categorical(_) => (0..column.len())
                .map(|row| Some(self.code(&category_text(column, row)) as f64))
                .collect(),
        };
        Column::numeric(column.name(), values)
    }
}

/// Encoding learned from the processed table, replayable on new tables.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EncodingState {
    sleep_column: Option<String>,
    financial_stress_column: Option<String>,
    encoders: Vec<LabelEncoder>,
}

impl EncodingState {
    /// Label encoders in table column order.
    #[must_use]
    pub fn encoders(&self) -> &[LabelEncoder] {
        &self.encoders
    }

    /// Encoder for the named column.
    #[must_use]
    pub fn encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.iter().find(|e| e.column == column)
    }

    /// Names of every column this state transforms, in application order.
    #[must_use]
    pub fn encoded_columns(&self) -> Vec<String> {
        self.sleep_column
            .iter()
            .chain(&self.financial_stress_column)
            .cloned()
            .chain(self.encoders.iter().map(|e| e.column.clone()))
            .collect()
    }

    /// Fit the encoding on `table` and return the encoded table.
    ///
    /// Domain columns that are absent from `table` are skipped. The target
    /// column is never label-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Table`] if a rebuilt column breaks table invariants.
    #[instrument(skip_all, fields(n_columns = table.n_columns()))]
    pub fn fit_transform(table: &Table, config: &PreprocessConfig) -> Result<(Table, Self), PrepError> {
        let present = |name: Option<&str>| -> Option<String> {
            let name = name?;
            if table.has_column(name) {
                Some(name.to_string())
            } else {
                debug!(column = name, "domain column absent; mapping skipped");
                None
            }
        };
        let mut state = Self {
            sleep_column: present(config.sleep_column()),
            financial_stress_column: present(config.financial_stress_column()),
            encoders: Vec::new(),
        };

        let mapped = state.apply_domain(table)?;
        state.encoders = mapped
            .columns()
            .iter()
            .filter(|c| c.as_categorical().is_some() && c.name() != config.target_column())
            .map(LabelEncoder::fit)
            .collect();
        let encoded = state.apply_encoders(mapped)?;

        debug!(
            n_label_encoded = state.encoders.len(),
            sleep = state.sleep_column.is_some(),
            financial_stress = state.financial_stress_column.is_some(),
            "categorical encoding fitted"
        );
        Ok((encoded, state))
    }

    /// Replay the fitted encoding on `table`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Table`] if a rebuilt column breaks table invariants.
    pub fn apply(&self, table: &Table) -> Result<Table, PrepError> {
        let mapped = self.apply_domain(table)?;
        self.apply_encoders(mapped)
    }

    fn apply_domain(&self, table: &Table) -> Result<Table, PrepError> {
        let mut out = table.clone();
        if let Some(name) = &self.sleep_column
            && let Some(column) = table.column(name)
        {
            out.replace_column(sleep_column(column))?;
        }
        if let Some(name) = &self.financial_stress_column
            && let Some(column) = table.column(name)
        {
            out.replace_column(financial_stress_column(column))?;
        }
        Ok(out)
    }

    fn apply_encoders(&self, mut table: Table) -> Result<Table, PrepError> {
        for encoder in &self.encoders {
            let Some(column) = table.column(&encoder.column) else {
                continue;
            };
            let encoded = encoder.transform(column);
            table.replace_column(encoded)?;
        }
        Ok(table)
    }
}
