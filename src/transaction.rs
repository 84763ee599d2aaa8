//! Explicit transaction handles and isolation levels.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use clap::ValueEnum;
use serde::Deserialize;

use crate::config::DatabaseOptions;
use crate::dialect::Dialect;
use crate::error::SqlRecordError;
use crate::executor::{DbClient, StatementExecutor};
use crate::query_builder::Statement;
use crate::results::QueryOutput;

/// Requested isolation for a transaction.
///
/// Parsing accepts the camelCase mode names and the SQL spellings; anything else falls
/// back to [`IsolationLevel::ReadUncommitted`]:
/// ```rust
/// use sql_record::prelude::*;
///
/// assert_eq!(IsolationLevel::from("repeatableRead"), IsolationLevel::RepeatableRead);
/// assert_eq!(IsolationLevel::from("READ COMMITTED"), IsolationLevel::ReadCommitted);
/// assert_eq!(IsolationLevel::from("snapshot"), IsolationLevel::ReadUncommitted);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IsolationLevel {
    Serializable,
    #[value(alias = "repeatableRead")]
    RepeatableRead,
    #[value(alias = "readCommitted")]
    ReadCommitted,
    #[default]
    #[value(alias = "readUncommitted")]
    ReadUncommitted,
}

impl IsolationLevel {
    /// SQL spelling used after `ISOLATION LEVEL`.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
        }
    }

    /// Parse a mode name, falling back to `ReadUncommitted` on anything unrecognized.
    #[must_use]
    pub fn from_mode(mode: &str) -> Self {
        let normalized: String = mode
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "serializable" => IsolationLevel::Serializable,
            "repeatableread" => IsolationLevel::RepeatableRead,
            "readcommitted" => IsolationLevel::ReadCommitted,
            "readuncommitted" => IsolationLevel::ReadUncommitted,
            _ => {
                tracing::warn!(mode, "unrecognized isolation mode, using READ UNCOMMITTED");
                IsolationLevel::ReadUncommitted
            }
        }
    }
}

impl From<&str> for IsolationLevel {
    fn from(mode: &str) -> Self {
        IsolationLevel::from_mode(mode)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Transaction bookkeeping shared by every clone of a [`Database`](crate::executor::Database).
#[derive(Debug, Default)]
pub(crate) struct TxSession {
    active: AtomicBool,
    // Set when a transaction is dropped while open; its ROLLBACK goes out first thing
    // on the next statement or transaction.
    abandoned: AtomicBool,
}

impl TxSession {
    /// Roll back a transaction that was dropped while open, if there is one.
    pub(crate) async fn settle(
        &self,
        client: &DbClient,
        options: &DatabaseOptions,
    ) -> Result<(), SqlRecordError> {
        if !self.abandoned.load(Ordering::Acquire) {
            return Ok(());
        }
        tracing::debug!(dialect = %client.dialect(), "rolling back abandoned transaction");
        client
            .execute(&Statement::without_params("ROLLBACK"), options)
            .await?;
        self.abandoned.store(false, Ordering::Release);
        Ok(())
    }
}

/// An open transaction on one [`Database`](crate::executor::Database) handle.
///
/// Pass it to repository calls to run them inside the transaction. [`commit`](Self::commit)
/// and [`rollback`](Self::rollback) consume the handle. Dropping it while open (including
/// cancelling the future that owns it) frees the database handle and schedules a
/// `ROLLBACK` that is sent before anything else on that handle.
pub struct Transaction {
    client: DbClient,
    options: DatabaseOptions,
    session: Arc<TxSession>,
    level: IsolationLevel,
    finished: bool,
}

impl Transaction {
    pub(crate) async fn begin(
        client: DbClient,
        options: DatabaseOptions,
        session: Arc<TxSession>,
        level: IsolationLevel,
    ) -> Result<Self, SqlRecordError> {
        if session
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SqlRecordError::TransactionActive);
        }

        let mut tx = Transaction {
            client,
            options,
            session,
            level,
            finished: false,
        };
        if let Err(e) = tx.session.settle(&tx.client, &tx.options).await {
            tx.release();
            return Err(e);
        }
        for sql in tx.client.dialect().begin_statements(level) {
            if let Err(e) = tx.run(&sql).await {
                tx.release();
                return Err(e);
            }
        }
        tracing::debug!(dialect = %tx.client.dialect(), isolation = %level, "transaction started");
        Ok(tx)
    }

    #[must_use]
    pub fn isolation_level(&self) -> IsolationLevel {
        self.level
    }

    /// Commit the transaction.
    ///
    /// # Errors
    /// Returns the client's failure as `QueryFailed`. The handle is released either way.
    pub async fn commit(mut self) -> Result<(), SqlRecordError> {
        let result = self.run("COMMIT").await;
        self.release();
        result
    }

    /// Roll the transaction back.
    ///
    /// # Errors
    /// Returns the client's failure as `QueryFailed`. The handle is released either way.
    pub async fn rollback(mut self) -> Result<(), SqlRecordError> {
        let result = self.run("ROLLBACK").await;
        self.release();
        result
    }

    async fn run(&self, sql: &str) -> Result<(), SqlRecordError> {
        self.client
            .execute(&Statement::without_params(sql), &self.options)
            .await
            .map(|_| ())
    }

    fn release(&mut self) {
        self.finished = true;
        self.session.active.store(false, Ordering::Release);
    }
}

#[async_trait]
impl StatementExecutor for Transaction {
    fn dialect(&self) -> Dialect {
        self.client.dialect()
    }

    async fn execute(&self, statement: &Statement) -> Result<QueryOutput, SqlRecordError> {
        self.client.execute(statement, &self.options).await
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                dialect = %self.client.dialect(),
                "transaction dropped without commit or rollback, rolling back on next use"
            );
            self.session.abandoned.store(true, Ordering::Release);
            self.session.active.store(false, Ordering::Release);
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("dialect", &self.client.dialect())
            .field("level", &self.level)
            .field("finished", &self.finished)
            .finish()
    }
}
