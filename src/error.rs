use thiserror::Error;

use crate::dialect::Dialect;
use crate::types::RowValues;

/// Error type produced by injected database clients.
pub type ClientError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SqlRecordError {
    #[error("Schema violation: `{field}` is not declared in the schema of `{table}`")]
    SchemaViolation { table: String, field: String },

    #[error("Configuration error in `{record_type}`: {reason}")]
    Configuration { record_type: String, reason: String },

    #[error("Required field `{field}` of `{table}` is missing")]
    RequiredFieldMissing { table: String, field: String },

    #[error("{dialect} query failed: {source}; sql: {sql}; params: {params:?}")]
    QueryFailed {
        dialect: Dialect,
        sql: String,
        params: Vec<RowValues>,
        #[source]
        source: ClientError,
    },

    #[error("{dialect} query was cancelled before completion; sql: {sql}; params: {params:?}")]
    Cancelled {
        dialect: Dialect,
        sql: String,
        params: Vec<RowValues>,
    },

    #[error("Parameter error ({dialect}): {reason}; sql: {sql}")]
    Parameter {
        dialect: Dialect,
        sql: String,
        reason: String,
    },

    #[error("A transaction is already active on this database handle")]
    TransactionActive,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
}

impl SqlRecordError {
    pub(crate) fn schema_violation(table: &str, field: &str) -> Self {
        SqlRecordError::SchemaViolation {
            table: table.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn required_missing(table: &str, field: &str) -> Self {
        SqlRecordError::RequiredFieldMissing {
            table: table.to_string(),
            field: field.to_string(),
        }
    }

    /// True when the error originated in the injected client rather than in this crate.
    #[must_use]
    pub fn is_query_failure(&self) -> bool {
        matches!(
            self,
            SqlRecordError::QueryFailed { .. } | SqlRecordError::Cancelled { .. }
        )
    }
}
