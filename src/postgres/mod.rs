// tokio-postgres backed `PgClient`
//
// - params: `ToSql` for `RowValues`
// - query: row extraction and the `PgClient` impls

mod config;
pub mod params;
pub mod query;

pub use params::Params;
pub use query::{build_result_set_from_statement, postgres_extract_value};
