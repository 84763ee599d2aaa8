//! SQL dialects and the adapters that run canonical statements against injected clients.
//!
//! Statements are generated once in canonical form (`$n` placeholders, trailing
//! `RETURNING *`). [`Dialect::render`] is the final pass that turns them into the text a
//! given server understands; [`postgres`] and [`mysql`] hold the client seams.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::Deserialize;

use crate::error::SqlRecordError;
use crate::query_builder::Statement;
use crate::transaction::IsolationLevel;
use crate::translation::{PlaceholderStyle, translate_placeholders};

pub mod mysql;
pub mod postgres;

static RETURNING_ALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+RETURNING\s+\*\s*;?\s*$").expect("static regex")
});
static INSERT_DEFAULT_VALUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\s*INSERT\s+INTO\s+\S+)\s+DEFAULT\s+VALUES\b").expect("static regex")
});

/// The closed set of wire dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `$n` placeholders, `RETURNING *` honored.
    Postgres,
    /// Bare `?` placeholders, `RETURNING *` stripped, generated keys reported by the client.
    #[value(name = "mysql")]
    #[serde(rename = "mysql")]
    MySql,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => f.write_str("postgres"),
            Dialect::MySql => f.write_str("mysql"),
        }
    }
}

impl Dialect {
    #[must_use]
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Dialect::Postgres => PlaceholderStyle::Postgres,
            Dialect::MySql => PlaceholderStyle::MySql,
        }
    }

    /// Text of the `n`th (1-based) placeholder.
    #[must_use]
    pub fn render_placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            Dialect::MySql => "?".to_string(),
        }
    }

    #[must_use]
    pub fn supports_returning(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// Remove a trailing `RETURNING *` when the dialect cannot honor it.
    #[must_use]
    pub fn strip_returning(self, sql: &str) -> Cow<'_, str> {
        if self.supports_returning() {
            Cow::Borrowed(sql)
        } else {
            RETURNING_ALL.replace(sql, "")
        }
    }

    /// Turn a canonical statement into dialect text and re-bound parameters.
    ///
    /// # Errors
    /// Returns `SqlRecordError::Parameter` when a placeholder has no matching parameter.
    pub fn render(self, statement: &Statement) -> Result<Statement, SqlRecordError> {
        let translated =
            translate_placeholders(&statement.sql, &statement.params, self.placeholder_style())
                .map_err(|e| SqlRecordError::Parameter {
                    dialect: self,
                    sql: statement.sql.clone(),
                    reason: e.to_string(),
                })?;

        let sql = match self {
            Dialect::Postgres => translated.sql.into_owned(),
            Dialect::MySql => {
                let stripped = self.strip_returning(&translated.sql);
                INSERT_DEFAULT_VALUES
                    .replace(&stripped, "$1 () VALUES ()")
                    .into_owned()
            }
        };

        Ok(Statement::new(sql, translated.params.into_owned()))
    }

    /// Statements that open a transaction at `level`, in execution order.
    #[must_use]
    pub fn begin_statements(self, level: IsolationLevel) -> Vec<String> {
        match self {
            Dialect::Postgres => vec![format!(
                "START TRANSACTION ISOLATION LEVEL {}",
                level.as_sql()
            )],
            Dialect::MySql => vec![
                format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql()),
                "START TRANSACTION".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    fn stmt(sql: &str, n: i64) -> Statement {
        Statement::new(sql, (1..=n).map(RowValues::Int).collect())
    }

    #[test]
    fn postgres_render_is_verbatim() {
        let s = stmt("INSERT INTO t (a, b) VALUES ($1, $2) RETURNING *", 2);
        assert_eq!(Dialect::Postgres.render(&s).unwrap(), s);
    }

    #[test]
    fn mysql_render_rewrites_placeholders_and_strips_returning() {
        let s = stmt("UPDATE t SET a = $1, b = $2 WHERE id = $3 RETURNING *", 3);
        let rendered = Dialect::MySql.render(&s).unwrap();
        assert_eq!(rendered.sql, "UPDATE t SET a = ?, b = ? WHERE id = ?");
        assert_eq!(rendered.params, s.params);
    }

    #[test]
    fn mysql_empty_insert() {
        let s = stmt("INSERT INTO t DEFAULT VALUES RETURNING *", 0);
        let rendered = Dialect::MySql.render(&s).unwrap();
        assert_eq!(rendered.sql, "INSERT INTO t () VALUES ()");
    }

    #[test]
    fn placeholder_text() {
        assert_eq!(Dialect::Postgres.render_placeholder(3), "$3");
        assert_eq!(Dialect::MySql.render_placeholder(3), "?");
    }

    #[test]
    fn missing_parameter_is_reported_with_dialect() {
        let s = stmt("SELECT * FROM t WHERE a = $2", 1);
        let err = Dialect::MySql.render(&s).unwrap_err();
        assert!(matches!(err, SqlRecordError::Parameter { dialect: Dialect::MySql, .. }));
    }

    #[test]
    fn begin_statements_per_dialect() {
        assert_eq!(
            Dialect::Postgres.begin_statements(IsolationLevel::Serializable),
            vec!["START TRANSACTION ISOLATION LEVEL SERIALIZABLE".to_string()]
        );
        assert_eq!(
            Dialect::MySql.begin_statements(IsolationLevel::ReadCommitted),
            vec![
                "SET TRANSACTION ISOLATION LEVEL READ COMMITTED".to_string(),
                "START TRANSACTION".to_string()
            ]
        );
    }
}
