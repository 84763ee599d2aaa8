use serde::Deserialize;

/// Per-handle options for a [`Database`](crate::executor::Database).
///
/// Deserializable so applications can keep it next to their own settings:
/// ```rust
/// use sql_record::prelude::*;
///
/// let options: DatabaseOptions = serde_json::from_str(r#"{ "log_statements": true }"#).unwrap();
/// assert!(options.log_statements);
/// assert!(!DatabaseOptions::default().log_statements);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Log every rendered statement at `info` instead of `debug`.
    pub log_statements: bool,
}

impl DatabaseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_log_statements(mut self, log_statements: bool) -> Self {
        self.log_statements = log_statements;
        self
    }
}
