//! Convenient imports for common functionality.
//!
//! This module re-exports the types needed to declare a record type, run it against a
//! client, and work with transactions.

pub use crate::config::DatabaseOptions;
pub use crate::dialect::Dialect;
pub use crate::dialect::mysql::{MySqlCallback, MySqlClient, MySqlResponse};
pub use crate::dialect::postgres::PgClient;
pub use crate::error::{ClientError, SqlRecordError};
pub use crate::executor::{Database, DbClient, StatementExecutor};
pub use crate::query_builder::Statement;
pub use crate::record::{FieldValues, Record};
pub use crate::results::{CustomDbRow, QueryOutput, ResultSet};
pub use crate::schema::{FieldSpec, Model, SchemaSpec};
pub use crate::transaction::{IsolationLevel, Transaction};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::RowValues;
