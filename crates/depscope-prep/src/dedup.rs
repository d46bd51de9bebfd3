//! Exact duplicate-row removal.

use std::collections::HashSet;

use depscope_io::Table;
use tracing::debug;

/// Remove rows that repeat an earlier row exactly, keeping first occurrences
/// in their original order. Missing markers compare equal to each other.
///
/// Returns the deduplicated table and the number of rows removed.
#[must_use]
pub fn remove_duplicates(table: &Table) -> (Table, usize) {
    let mut seen = HashSet::with_capacity(table.n_rows());
    let keep: Vec<usize> = (0..table.n_rows())
        .filter(|&row| seen.insert(table.row_key(row)))
        .collect();
    let removed = table.n_rows() - keep.len();
    debug!(removed, "removed duplicate rows");
    if removed == 0 {
        return (table.clone(), 0);
    }
    (table.take_rows(&keep), removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscope_io::{Column, Value};

    fn sample() -> Table {
        Table::new(vec![
            Column::numeric("Age", vec![Some(20.0), Some(21.0), Some(20.0), None, None]),
            Column::categorical(
                "City",
                vec![
                    Some("Pune".into()),
                    Some("Pune".into()),
                    Some("Pune".into()),
                    Some("Agra".into()),
                    Some("Agra".into()),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn keeps_first_occurrence() {
        let (out, removed) = remove_duplicates(&sample());
        assert_eq!(removed, 2);
        assert_eq!(out.n_rows(), 3);
        assert_eq!(out.column("Age").unwrap().value(1), Value::Number(21.0));
        assert!(out.column("Age").unwrap().is_missing(2));
    }

    #[test]
    fn idempotent() {
        let (once, _) = remove_duplicates(&sample());
        let (twice, removed) = remove_duplicates(&once);
        assert_eq!(removed, 0);
        assert_eq!(once, twice);
    }
}
