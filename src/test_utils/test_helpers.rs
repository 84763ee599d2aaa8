use std::sync::Arc;

use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: &[&str], values: Vec<RowValues>) -> CustomDbRow {
    let column_names = column_names.iter().map(|c| (*c).to_string()).collect();
    CustomDbRow::new(Arc::new(column_names), values)
}

/// A result set of `rows`, all sharing `column_names`.
#[must_use]
pub fn result_set(column_names: &[&str], rows: Vec<Vec<RowValues>>) -> ResultSet {
    let mut set = ResultSet::with_capacity(rows.len());
    set.set_column_names(Arc::new(column_names.iter().map(|c| (*c).to_string()).collect()));
    for row in rows {
        set.add_row_values(row);
    }
    set
}
