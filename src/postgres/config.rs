use std::sync::Arc;

use deadpool_postgres::{Config as PgConfig, Runtime};
use tokio_postgres::NoTls;

use crate::config::DatabaseOptions;
use crate::error::SqlRecordError;
use crate::executor::Database;

impl Database {
    /// Connect to Postgres and wrap one pooled connection.
    ///
    /// Transactions are issued as plain statements, so every statement must go over the
    /// same connection: the handle holds a single `deadpool_postgres::Object`.
    ///
    /// # Errors
    /// Returns `SqlRecordError::Config` if a required field is missing, or
    /// `SqlRecordError::Connection` if the pool or the connection cannot be created.
    pub async fn connect_postgres(
        pg_config: PgConfig,
        options: DatabaseOptions,
    ) -> Result<Self, SqlRecordError> {
        let required = [
            ("dbname", pg_config.dbname.is_none()),
            ("host", pg_config.host.is_none()),
            ("port", pg_config.port.is_none()),
            ("user", pg_config.user.is_none()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, missing)| *missing) {
            return Err(SqlRecordError::Config(format!("{field} is required")));
        }

        let pool = pg_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| {
                SqlRecordError::Connection(format!("Failed to create Postgres pool: {e}"))
            })?;
        let conn = pool.get().await.map_err(|e| {
            SqlRecordError::Connection(format!("Failed to get Postgres connection: {e}"))
        })?;

        tracing::debug!(host = ?pg_config.host, dbname = ?pg_config.dbname, "connected to postgres");
        Ok(Database::postgres(Arc::new(conn)).with_options(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_dbname_is_rejected_before_connecting() {
        let mut cfg = PgConfig::new();
        cfg.host = Some("localhost".to_string());
        cfg.port = Some(5432);
        cfg.user = Some("postgres".to_string());
        let err = Database::connect_postgres(cfg, DatabaseOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SqlRecordError::Config(ref m) if m == "dbname is required"));
    }
}
