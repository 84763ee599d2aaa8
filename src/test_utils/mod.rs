//! Recording client doubles for both dialects.
//!
//! Every statement that reaches a client is recorded after rendering, so tests can assert on
//! exactly what the server would have seen.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::dialect::mysql::{MySqlCallback, MySqlClient, MySqlResponse};
use crate::dialect::postgres::PgClient;
use crate::error::ClientError;
use crate::results::ResultSet;
use crate::types::RowValues;

pub mod test_helpers;

pub use test_helpers::{create_test_row, result_set};

/// One statement as the client received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub sql: String,
    pub params: Vec<RowValues>,
}

#[derive(Default)]
struct CallLog(Mutex<Vec<RecordedCall>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, sql: &str, params: &[RowValues]) {
        self.lock().push(RecordedCall {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }
}

pub type PgResponder =
    Box<dyn Fn(&str, &[RowValues]) -> Result<ResultSet, ClientError> + Send + Sync>;

/// A `PgClient` that records each call and answers through a responder closure.
pub struct RecordingPgClient {
    log: CallLog,
    responder: PgResponder,
}

impl RecordingPgClient {
    /// Answers every statement with an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::with_responder(|_, _| Ok(ResultSet::default()))
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str, &[RowValues]) -> Result<ResultSet, ClientError> + Send + Sync + 'static,
    {
        RecordingPgClient {
            log: CallLog::default(),
            responder: Box::new(responder),
        }
    }

    /// Answers statements containing `RETURNING` or starting with `SELECT` with `rows`;
    /// everything else gets an empty result.
    #[must_use]
    pub fn returning_rows(rows: ResultSet) -> Self {
        Self::with_responder(move |sql, _| {
            let upper = sql.trim_start().to_ascii_uppercase();
            if upper.starts_with("SELECT") || upper.contains(" RETURNING ") {
                Ok(rows.clone())
            } else {
                Ok(ResultSet::default())
            }
        })
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.log.lock().clone()
    }

    #[must_use]
    pub fn sql_log(&self) -> Vec<String> {
        self.log.lock().iter().map(|c| c.sql.clone()).collect()
    }
}

impl Default for RecordingPgClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PgClient for RecordingPgClient {
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, ClientError> {
        self.log.record(sql, params);
        (self.responder)(sql, params)
    }
}

/// `None` means the callback is dropped without being called.
pub type MySqlResponder = Box<
    dyn Fn(&str, &[RowValues]) -> Option<Result<MySqlResponse, ClientError>> + Send + Sync,
>;

/// A `MySqlClient` that records each call and completes its callback through a responder.
pub struct RecordingMySqlClient {
    log: CallLog,
    responder: MySqlResponder,
}

impl RecordingMySqlClient {
    /// Acknowledges every statement with one affected row and no generated key.
    #[must_use]
    pub fn new() -> Self {
        Self::with_responder(|_, _| {
            Some(Ok(MySqlResponse::Ack {
                affected_rows: 1,
                insert_id: 0,
            }))
        })
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str, &[RowValues]) -> Option<Result<MySqlResponse, ClientError>>
            + Send
            + Sync
            + 'static,
    {
        RecordingMySqlClient {
            log: CallLog::default(),
            responder: Box::new(responder),
        }
    }

    /// Acknowledges inserts with `insert_id`, answers `SELECT`s with `rows`, and acks the rest.
    #[must_use]
    pub fn with_insert_id(insert_id: u64, rows: ResultSet) -> Self {
        Self::with_responder(move |sql, _| {
            let upper = sql.trim_start().to_ascii_uppercase();
            let response = if upper.starts_with("INSERT") {
                MySqlResponse::Ack {
                    affected_rows: 1,
                    insert_id,
                }
            } else if upper.starts_with("SELECT") {
                let fields = rows
                    .get_column_names()
                    .map(|c| c.as_ref().clone())
                    .unwrap_or_default();
                MySqlResponse::Rows {
                    rows: rows.clone(),
                    fields,
                }
            } else {
                MySqlResponse::Ack {
                    affected_rows: 1,
                    insert_id: 0,
                }
            };
            Some(Ok(response))
        })
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.log.lock().clone()
    }

    #[must_use]
    pub fn sql_log(&self) -> Vec<String> {
        self.log.lock().iter().map(|c| c.sql.clone()).collect()
    }
}

impl Default for RecordingMySqlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlClient for RecordingMySqlClient {
    fn query(&self, sql: &str, params: &[RowValues], callback: MySqlCallback) {
        self.log.record(sql, params);
        if let Some(result) = (self.responder)(sql, params) {
            callback(result);
        }
    }
}
