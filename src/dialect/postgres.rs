use async_trait::async_trait;

use super::Dialect;
use crate::error::{ClientError, SqlRecordError};
use crate::query_builder::Statement;
use crate::results::{QueryOutput, ResultSet};
use crate::types::RowValues;

/// Client contract for the Postgres dialect: run one statement, suspend until it completes,
/// and hand back the normalized rows.
///
/// Implemented for `tokio_postgres::Client` and `deadpool_postgres::Object` behind the
/// `postgres` feature.
#[async_trait]
pub trait PgClient: Send + Sync {
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, ClientError>;
}

/// Execute an already-rendered statement.
pub(crate) async fn execute(
    client: &dyn PgClient,
    rendered: Statement,
) -> Result<QueryOutput, SqlRecordError> {
    match client.query(&rendered.sql, &rendered.params).await {
        Ok(result_set) => Ok(QueryOutput::from_rows(result_set)),
        Err(source) => Err(SqlRecordError::QueryFailed {
            dialect: Dialect::Postgres,
            sql: rendered.sql,
            params: rendered.params,
            source,
        }),
    }
}
