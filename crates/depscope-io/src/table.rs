//! In-memory table: ordered, named, typed columns of equal length.

use std::collections::HashSet;
use std::fmt;

use crate::IoError;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Floating-point cells.
    Numeric,
    /// Free-text / category cells.
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => f.write_str("numeric"),
            ColumnKind::Categorical => f.write_str("categorical"),
        }
    }
}

/// Cell storage for one column. `None` is the missing marker.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Numeric cells.
    Numeric(Vec<Option<f64>>),
    /// Categorical cells.
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    /// Return `true` when the column has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A borrowed view of a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// The missing marker.
    Missing,
    /// A numeric cell.
    Number(f64),
    /// A categorical cell.
    Text(&'a str),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Hashable identity of a cell, used for duplicate detection.
///
/// Missing markers compare equal to each other; `-0.0` and `0.0` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKey<'a> {
    /// The missing marker.
    Missing,
    /// Bit pattern of a numeric cell.
    Number(u64),
    /// A categorical cell.
    Text(&'a str),
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Build a numeric column.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Build a categorical column.
    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    /// Build a column from existing storage.
    pub fn from_data(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the cell storage.
    #[must_use]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Consume the column and return its storage.
    #[must_use]
    pub fn into_data(self) -> ColumnData {
        self.data
    }

    /// Return the storage type.
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Return `true` when the column has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow numeric cells, or `None` for a categorical column.
    #[must_use]
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Borrow categorical cells, or `None` for a numeric column.
    #[must_use]
    pub fn as_categorical(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Categorical(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Return the cell at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.len()`.
    #[must_use]
    pub fn value(&self, row: usize) -> Value<'_> {
        match &self.data {
            ColumnData::Numeric(v) => v[row].map_or(Value::Missing, Value::Number),
            ColumnData::Categorical(v) => v[row].as_deref().map_or(Value::Missing, Value::Text),
        }
    }

    /// Return the hashable identity of the cell at `row`.
    #[must_use]
    pub fn key(&self, row: usize) -> CellKey<'_> {
        match self.value(row) {
            Value::Missing => CellKey::Missing,
            Value::Number(n) => {
                let n = if n == 0.0 { 0.0 } else { n };
                CellKey::Number(n.to_bits())
            }
            Value::Text(s) => CellKey::Text(s),
        }
    }

    /// Return `true` when the cell at `row` is the missing marker.
    #[must_use]
    pub fn is_missing(&self, row: usize) -> bool {
        matches!(self.value(row), Value::Missing)
    }

    /// Count missing markers.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Categorical(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Count distinct non-missing values.
    #[must_use]
    pub fn unique_count(&self) -> usize {
        (0..self.len())
            .map(|row| self.key(row))
            .filter(|k| *k != CellKey::Missing)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Build a new column containing only the given rows, in the given order.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(rows.iter().map(|&r| v[r].clone()).collect())
            }
        };
        Column {
            name: self.name.clone(),
            data,
        }
    }
}

/// An ordered collection of uniquely named, equal-length columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, validating equal column lengths and unique names.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::DuplicateColumn`] | Two columns share a name |
    /// | [`IoError::ColumnLengthMismatch`] | A column's length differs from the first column's |
    pub fn new(columns: Vec<Column>) -> Result<Self, IoError> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(IoError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
            if column.len() != n_rows {
                return Err(IoError::ColumnLengthMismatch {
                    column: column.name.clone(),
                    expected: n_rows,
                    got: column.len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Borrow all columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Consume the table and return its columns.
    #[must_use]
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Borrow the named column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Return `true` if a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Replace the column with the same name, keeping its position.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::ColumnNotFound`] | No column has this name |
    /// | [`IoError::ColumnLengthMismatch`] | The replacement has a different row count |
    pub fn replace_column(&mut self, column: Column) -> Result<(), IoError> {
        let idx = self
            .column_index(&column.name)
            .ok_or_else(|| IoError::ColumnNotFound {
                name: column.name.clone(),
            })?;
        let got = column.len();
        if got != self.n_rows {
            return Err(IoError::ColumnLengthMismatch {
                column: column.name,
                expected: self.n_rows,
                got,
            });
        }
        self.columns[idx] = column;
        Ok(())
    }

    /// Build a new table containing only the given rows, in the given order.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take_rows(rows)).collect(),
            n_rows: rows.len(),
        }
    }

    /// Borrow the cells of one row, in column order.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<Value<'_>> {
        self.columns.iter().map(|c| c.value(row)).collect()
    }

    /// Hashable identity of one row.
    #[must_use]
    pub fn row_key(&self, row: usize) -> Vec<CellKey<'_>> {
        self.columns.iter().map(|c| c.key(row)).collect()
    }

    /// Return `true` if any cell in the row is missing.
    #[must_use]
    pub fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.is_missing(row))
    }

    /// Total count of missing markers across all cells.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Count rows that repeat an earlier row exactly.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.n_rows);
        (0..self.n_rows)
            .filter(|&row| !seen.insert(self.row_key(row)))
            .count()
    }
}
