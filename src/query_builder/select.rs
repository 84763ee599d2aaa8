use std::sync::LazyLock;

use regex::Regex;

use super::Statement;
use crate::types::RowValues;

static LEADING_WHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*WHERE\b").expect("static regex"));

/// `SELECT * FROM <table> [WHERE <fragment>]`.
///
/// The fragment is caller SQL and is not parsed. An empty fragment selects everything; a
/// fragment that already begins with `WHERE` is used as given.
#[must_use]
pub fn build_select(table: &str, where_fragment: &str, values: &[RowValues]) -> Statement {
    let fragment = where_fragment.trim();
    let sql = if fragment.is_empty() {
        format!("SELECT * FROM {table}")
    } else if LEADING_WHERE.is_match(fragment) {
        format!("SELECT * FROM {table} {fragment}")
    } else {
        format!("SELECT * FROM {table} WHERE {fragment}")
    };
    Statement::new(sql, values.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments() {
        assert_eq!(build_select("t", "", &[]).sql, "SELECT * FROM t");
        assert_eq!(
            build_select("t", "name = $1 LIMIT 1", &[RowValues::Int(1)]).sql,
            "SELECT * FROM t WHERE name = $1 LIMIT 1"
        );
        assert_eq!(
            build_select("t", "  where name = $1", &[]).sql,
            "SELECT * FROM t where name = $1"
        );
        assert_eq!(
            build_select("t", "whereabouts = $1", &[]).sql,
            "SELECT * FROM t WHERE whereabouts = $1"
        );
    }
}
