use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::{Client, Statement};

use super::params::Params;
use crate::dialect::postgres::PgClient;
use crate::error::{ClientError, SqlRecordError};
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `SqlRecordError::Postgres` if the column cannot be decoded.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, SqlRecordError> {
    let type_info = row.columns()[idx].type_();

    let value = match type_info.name() {
        "int2" => row.try_get::<_, Option<i16>>(idx)?.map(|v| RowValues::Int(i64::from(v))),
        "int4" => row.try_get::<_, Option<i32>>(idx)?.map(|v| RowValues::Int(i64::from(v))),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(f64::from(v))),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        "bool" => row.try_get::<_, Option<bool>>(idx)?.map(RowValues::Bool),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(RowValues::Timestamp),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        "json" | "jsonb" => row.try_get::<_, Option<Value>>(idx)?.map(RowValues::JSON),
        "bytea" => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(RowValues::Blob),
        // Everything else is read as text
        _ => row.try_get::<_, Option<String>>(idx)?.map(RowValues::Text),
    };

    Ok(value.unwrap_or(RowValues::Null))
}

/// Build a result set using statement metadata for column names, so empty results still
/// carry their columns.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set_from_statement(
    stmt: &Statement,
    rows: &[tokio_postgres::Row],
) -> Result<ResultSet, SqlRecordError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let row_values = (0..column_count)
            .map(|idx| postgres_extract_value(row, idx))
            .collect::<Result<Vec<_>, _>>()?;
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

async fn run_on_client(
    client: &Client,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, ClientError> {
    let converted = Params::convert(params);
    let stmt = client.prepare(sql).await?;

    // Statements without a row description (plain DML, transaction control) report a count.
    if stmt.columns().is_empty() {
        let affected = client.execute(&stmt, converted.as_refs()).await?;
        let mut result_set = ResultSet::default();
        result_set.rows_affected = usize::try_from(affected)?;
        return Ok(result_set);
    }

    let rows = client.query(&stmt, converted.as_refs()).await?;
    Ok(build_result_set_from_statement(&stmt, &rows)?)
}

#[async_trait]
impl PgClient for Client {
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, ClientError> {
        run_on_client(self, sql, params).await
    }
}

#[async_trait]
impl PgClient for deadpool_postgres::Object {
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, ClientError> {
        let client: &Client = self;
        run_on_client(client, sql, params).await
    }
}
