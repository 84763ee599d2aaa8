use tokio::sync::oneshot;

use super::Dialect;
use crate::error::{ClientError, SqlRecordError};
use crate::query_builder::Statement;
use crate::results::{QueryOutput, ResultSet};
use crate::types::RowValues;

/// What a MySQL-style client reports for one statement.
#[derive(Debug, Clone)]
pub enum MySqlResponse {
    /// Result rows plus the field metadata that came with them.
    Rows { rows: ResultSet, fields: Vec<String> },
    /// DML acknowledgement. `insert_id` of `0` means no key was generated.
    Ack { affected_rows: u64, insert_id: u64 },
}

/// Error-first completion handed to [`MySqlClient::query`]. Called at most once.
pub type MySqlCallback = Box<dyn FnOnce(Result<MySqlResponse, ClientError>) + Send + 'static>;

/// Client contract for the MySQL dialect: callback-style execution.
///
/// The client must invoke `callback` exactly once. Dropping it without calling it is
/// surfaced to the caller as `SqlRecordError::Cancelled`.
pub trait MySqlClient: Send + Sync {
    fn query(&self, sql: &str, params: &[RowValues], callback: MySqlCallback);
}

/// Execute an already-rendered statement, bridging the callback into a single awaited result.
pub(crate) async fn execute(
    client: &dyn MySqlClient,
    rendered: Statement,
) -> Result<QueryOutput, SqlRecordError> {
    let (tx, rx) = oneshot::channel();
    client.query(
        &rendered.sql,
        &rendered.params,
        Box::new(move |result| {
            // The receiver may be gone if the caller was cancelled; nothing to report then.
            let _ = tx.send(result);
        }),
    );

    match rx.await {
        Ok(Ok(response)) => Ok(normalize(response)),
        Ok(Err(source)) => Err(SqlRecordError::QueryFailed {
            dialect: Dialect::MySql,
            sql: rendered.sql,
            params: rendered.params,
            source,
        }),
        Err(_) => Err(SqlRecordError::Cancelled {
            dialect: Dialect::MySql,
            sql: rendered.sql,
            params: rendered.params,
        }),
    }
}

fn normalize(response: MySqlResponse) -> QueryOutput {
    match response {
        MySqlResponse::Rows { rows, fields } => QueryOutput {
            rows_affected: rows.rows_affected,
            result_set: rows,
            generated_key: None,
            fields,
        },
        MySqlResponse::Ack {
            affected_rows,
            insert_id,
        } => QueryOutput {
            result_set: ResultSet::default(),
            rows_affected: usize::try_from(affected_rows).unwrap_or(usize::MAX),
            generated_key: i64::try_from(insert_id)
                .ok()
                .filter(|id| *id != 0)
                .map(RowValues::Int),
            fields: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Acking;

    impl MySqlClient for Acking {
        fn query(&self, _sql: &str, _params: &[RowValues], callback: MySqlCallback) {
            callback(Ok(MySqlResponse::Ack {
                affected_rows: 1,
                insert_id: 42,
            }));
        }
    }

    struct Dropping;

    impl MySqlClient for Dropping {
        fn query(&self, _sql: &str, _params: &[RowValues], callback: MySqlCallback) {
            drop(callback);
        }
    }

    #[tokio::test]
    async fn ack_carries_generated_key() {
        let out = execute(&Acking, Statement::without_params("INSERT INTO t () VALUES ()"))
            .await
            .unwrap();
        assert_eq!(out.generated_key, Some(RowValues::Int(42)));
        assert_eq!(out.rows_affected, 1);
    }

    #[tokio::test]
    async fn dropped_callback_is_cancelled() {
        let err = execute(&Dropping, Statement::without_params("SELECT 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SqlRecordError::Cancelled { .. }));
    }

    #[test]
    fn zero_insert_id_is_no_key() {
        let out = normalize(MySqlResponse::Ack {
            affected_rows: 1,
            insert_id: 0,
        });
        assert_eq!(out.generated_key, None);
    }
}
