//! Canonical statement generation.
//!
//! Everything here emits `$n` placeholders and, for writes, a trailing `RETURNING *`.
//! [`Dialect::render`](crate::dialect::Dialect::render) adapts the text for the target
//! server afterwards.

mod dml;
mod select;

pub use dml::{build_delete, build_insert, build_update};
pub use select::build_select;

use crate::dialect::Dialect;
use crate::types::RowValues;

/// A statement and its positional parameters bundled together.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<RowValues>,
}

impl Statement {
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    #[must_use]
    pub fn without_params(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Accumulates `column = $n` style fragments while numbering placeholders.
#[derive(Default)]
pub(crate) struct ParamList {
    params: Vec<RowValues>,
}

impl ParamList {
    /// Bind `value` and return its placeholder.
    pub(crate) fn bind(&mut self, value: RowValues) -> String {
        self.params.push(value);
        Dialect::Postgres.render_placeholder(self.params.len())
    }

    pub(crate) fn into_params(self) -> Vec<RowValues> {
        self.params
    }
}
