//! The injected-client seam: one [`Database`] handle per externally supplied client.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DatabaseOptions;
use crate::dialect::Dialect;
use crate::dialect::mysql::{self, MySqlClient};
use crate::dialect::postgres::{self, PgClient};
use crate::error::SqlRecordError;
use crate::query_builder::Statement;
use crate::record::Record;
use crate::results::QueryOutput;
use crate::schema::Model;
use crate::transaction::{IsolationLevel, Transaction, TxSession};
use crate::types::RowValues;

/// Anything that can run a canonical statement: a [`Database`] or an open [`Transaction`].
///
/// Repository calls are generic over this trait, so the same `insert` runs standalone or
/// inside a transaction depending on the handle passed in.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Render `statement` for [`dialect`](Self::dialect) and run it.
    async fn execute(&self, statement: &Statement) -> Result<QueryOutput, SqlRecordError>;
}

/// The supplied client, tagged with its dialect.
#[derive(Clone)]
pub enum DbClient {
    Postgres(Arc<dyn PgClient>),
    MySql(Arc<dyn MySqlClient>),
}

impl DbClient {
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            DbClient::Postgres(_) => Dialect::Postgres,
            DbClient::MySql(_) => Dialect::MySql,
        }
    }

    pub(crate) async fn execute(
        &self,
        statement: &Statement,
        options: &DatabaseOptions,
    ) -> Result<QueryOutput, SqlRecordError> {
        let dialect = self.dialect();
        let rendered = dialect.render(statement)?;

        if options.log_statements {
            tracing::info!(%dialect, sql = %rendered.sql, params = rendered.params.len(), "executing statement");
        } else {
            tracing::debug!(%dialect, sql = %rendered.sql, params = rendered.params.len(), "executing statement");
        }

        let result = match self {
            DbClient::Postgres(client) => postgres::execute(client.as_ref(), rendered).await,
            DbClient::MySql(client) => mysql::execute(client.as_ref(), rendered).await,
        };

        if let Err(ref e) = result {
            tracing::warn!(%dialect, error = %e, "statement failed");
        }
        result
    }
}

impl fmt::Debug for DbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DbClient").field(&self.dialect()).finish()
    }
}

/// Handle over one injected client.
///
/// Clones share the client and its transaction state, so at most one [`Transaction`] is
/// open per client at a time. A transaction dropped while open is rolled back before the
/// next statement runs through any clone.
#[derive(Clone, Debug)]
pub struct Database {
    client: DbClient,
    options: DatabaseOptions,
    session: Arc<TxSession>,
}

impl Database {
    #[must_use]
    pub fn new(client: DbClient) -> Self {
        Database {
            client,
            options: DatabaseOptions::default(),
            session: Arc::new(TxSession::default()),
        }
    }

    /// Wrap a Postgres-style client (`$n` placeholders, `RETURNING *`).
    #[must_use]
    pub fn postgres<C: PgClient + 'static>(client: Arc<C>) -> Self {
        Self::new(DbClient::Postgres(client))
    }

    /// Wrap a MySQL-style client (`?` placeholders, callback completion).
    #[must_use]
    pub fn mysql<C: MySqlClient + 'static>(client: Arc<C>) -> Self {
        Self::new(DbClient::MySql(client))
    }

    #[must_use]
    pub fn with_options(mut self, options: DatabaseOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    #[must_use]
    pub fn client(&self) -> &DbClient {
        &self.client
    }

    /// Run caller SQL written with `$n` (or `?n`) placeholders.
    ///
    /// # Errors
    /// Returns `Parameter` for a dangling placeholder and `QueryFailed`/`Cancelled` from the client.
    pub async fn query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<QueryOutput, SqlRecordError> {
        self.execute(&Statement::new(sql, params.to_vec())).await
    }

    /// Run caller SQL and hydrate every returned row as a persisted `Record<M>`.
    ///
    /// # Errors
    /// As [`query`](Self::query), plus `SchemaViolation` for columns outside `M`'s schema.
    pub async fn query_as<M: Model>(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<Record<M>>, SqlRecordError> {
        let output = self.query(sql, params).await?;
        output
            .result_set
            .results
            .iter()
            .map(Record::from_row)
            .collect()
    }

    /// Open a transaction at `level`. Accepts an [`IsolationLevel`] or a mode name.
    ///
    /// # Errors
    /// Returns `TransactionActive` if this handle (or a clone) already has one open, or the
    /// client's failure while sending the isolation/begin statements.
    pub async fn start_transaction(
        &self,
        level: impl Into<IsolationLevel>,
    ) -> Result<Transaction, SqlRecordError> {
        Transaction::begin(
            self.client.clone(),
            self.options,
            self.session.clone(),
            level.into(),
        )
        .await
    }

    /// Run `f` inside a transaction: commit when it succeeds, roll back when it fails.
    ///
    /// The callback's error is logged and then returned to the caller after the rollback.
    /// A rollback failure is logged only; the callback's error is still what comes back.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use sql_record::prelude::*;
    /// # struct Account;
    /// # impl Model for Account {
    /// #     fn schema() -> SchemaSpec {
    /// #         SchemaSpec::new("accounts").field("id", FieldSpec::new().primary_key())
    /// #     }
    /// # }
    /// # async fn demo(db: Database) -> Result<(), SqlRecordError> {
    /// let id = db
    ///     .run_in_transaction(IsolationLevel::Serializable, async |tx| {
    ///         let mut account = Record::<Account>::new()?;
    ///         account.insert(tx).await?;
    ///         Ok::<_, SqlRecordError>(account.get("id")?)
    ///     })
    ///     .await?;
    /// # let _ = id;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns the error from starting or committing the transaction, or the callback's error.
    pub async fn run_in_transaction<T, E, F>(
        &self,
        level: impl Into<IsolationLevel>,
        f: F,
    ) -> Result<T, E>
    where
        F: AsyncFnOnce(&Transaction) -> Result<T, E>,
        E: From<SqlRecordError> + fmt::Display,
    {
        let tx = self.start_transaction(level).await?;
        match f(&tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tracing::error!(dialect = %self.client.dialect(), error = %err, "transaction callback failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(dialect = %self.client.dialect(), error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl StatementExecutor for Database {
    fn dialect(&self) -> Dialect {
        self.client.dialect()
    }

    async fn execute(&self, statement: &Statement) -> Result<QueryOutput, SqlRecordError> {
        self.session.settle(&self.client, &self.options).await?;
        self.client.execute(statement, &self.options).await
    }
}
