use std::collections::HashMap;
use std::sync::Arc;

use super::row::{CustomDbRow, index_columns};
use crate::types::RowValues;

/// Rows returned by a statement, normalized across dialects.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// The number of rows affected (for DML statements)
    pub rows_affected: usize,
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Set the column names shared by every row added afterwards.
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row of values in column order.
    ///
    /// Ignored until [`set_column_names`](Self::set_column_names) has been called.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let (Some(column_names), Some(cache)) = (&self.column_names, &self.column_index_cache) {
            self.results.push(CustomDbRow {
                column_names: column_names.clone(),
                rows: row_values,
                column_index_cache: cache.clone(),
            });
            self.rows_affected += 1;
        }
    }

    /// Build a result set from `(column, value)` maps, as row-object drivers hand them out.
    ///
    /// Columns are taken from the first row; later rows are read by name and missing
    /// columns become `Null`.
    #[must_use]
    pub fn from_named_rows<I, R, K>(rows: I) -> ResultSet
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, RowValues)>,
        K: Into<String>,
    {
        let mut result_set = ResultSet::default();
        for row in rows {
            let pairs: Vec<(String, RowValues)> =
                row.into_iter().map(|(k, v)| (k.into(), v)).collect();
            if result_set.column_names.is_none() {
                let names = pairs.iter().map(|(k, _)| k.clone()).collect();
                result_set.set_column_names(Arc::new(names));
            }
            let Some(columns) = result_set.column_names.clone() else {
                continue;
            };
            let mut by_name: HashMap<String, RowValues> = pairs.into_iter().collect();
            let values = columns
                .iter()
                .map(|c| by_name.remove(c).unwrap_or(RowValues::Null))
                .collect();
            result_set.add_row_values(values);
        }
        result_set
    }

    #[must_use]
    pub fn first(&self) -> Option<&CustomDbRow> {
        self.results.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Normalized outcome of executing one statement through a dialect adapter.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Returned rows (`RETURNING *` or `SELECT`); empty for MySQL DML.
    pub result_set: ResultSet,
    /// Rows the server reports as changed or returned.
    pub rows_affected: usize,
    /// Auto-increment key reported by the client, if any.
    pub generated_key: Option<RowValues>,
    /// Field metadata names reported alongside the rows.
    pub fields: Vec<String>,
}

impl QueryOutput {
    #[must_use]
    pub fn from_rows(result_set: ResultSet) -> Self {
        let rows_affected = result_set.rows_affected;
        let fields = result_set
            .get_column_names()
            .map(|c| c.as_ref().clone())
            .unwrap_or_default();
        QueryOutput {
            result_set,
            rows_affected,
            generated_key: None,
            fields,
        }
    }
}
