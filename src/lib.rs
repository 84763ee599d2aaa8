//! Schema-declared records over injected Postgres- or MySQL-style clients.
//!
//! A record type declares its fields once through [`Model::schema`]. [`Record`] instances
//! track which fields changed, and the repository calls ([`Record::insert`],
//! [`Record::update`], [`Record::delete`], [`Record::save`], [`Record::select`]) turn those
//! changes into parameterized statements rendered for the client's [`Dialect`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sql_record::prelude::*;
//!
//! struct User;
//!
//! impl Model for User {
//!     fn schema() -> SchemaSpec {
//!         SchemaSpec::new("users")
//!             .field("id", FieldSpec::new().primary_key())
//!             .field("name", FieldSpec::new().required())
//!             .field("active", FieldSpec::new().default_value(true))
//!     }
//! }
//!
//! # async fn demo(client: Arc<impl PgClient + 'static>) -> Result<(), SqlRecordError> {
//! let db = Database::postgres(client);
//! let mut user = Record::<User>::with_values([("name", "alice")])?;
//! user.save(&db).await?; // INSERT INTO users (name, active) VALUES ($1, $2) RETURNING *
//! user.set("name", "alicia")?;
//! user.save(&db).await?; // UPDATE users SET name = $1 WHERE id = $2 RETURNING *
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod query_builder;
pub mod record;
pub mod results;
pub mod schema;
pub mod transaction;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::DatabaseOptions;
pub use dialect::Dialect;
pub use dialect::mysql::{MySqlCallback, MySqlClient, MySqlResponse};
pub use dialect::postgres::PgClient;
pub use error::{ClientError, SqlRecordError};
pub use executor::{Database, DbClient, StatementExecutor};
pub use query_builder::Statement;
pub use record::{FieldValues, Record};
pub use results::{CustomDbRow, QueryOutput, ResultSet};
pub use schema::{DefaultValue, FieldSpec, Model, RecordSchema, RecordTypeMetadata, SchemaSpec};
pub use transaction::{IsolationLevel, Transaction};
pub use types::RowValues;
