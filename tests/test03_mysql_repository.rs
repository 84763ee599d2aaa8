use std::sync::Arc;

use sql_record::prelude::*;
use sql_record::test_utils::RecordingMySqlClient;

struct Item;

impl Model for Item {
    fn schema() -> SchemaSpec {
        SchemaSpec::new("t")
            .field("id", FieldSpec::new().primary_key())
            .field("name", FieldSpec::new().default_value("N"))
            .field("active", FieldSpec::new().default_value(true))
            .field("field", FieldSpec::new())
    }
}

struct Country;

impl Model for Country {
    fn schema() -> SchemaSpec {
        SchemaSpec::new("countries")
            .field("code", FieldSpec::new().primary_key())
            .field("label", FieldSpec::new())
    }
}

struct Empty;

impl Model for Empty {
    fn schema() -> SchemaSpec {
        SchemaSpec::new("empties").field("id", FieldSpec::new().primary_key())
    }
}

// MySQL drivers hand back rows as column-keyed objects.
fn stored_item() -> ResultSet {
    ResultSet::from_named_rows([vec![
        ("id", RowValues::Int(3)),
        ("name", RowValues::Text("X".into())),
        ("active", RowValues::Int(1)),
        ("field", RowValues::Null),
    ]])
}

#[tokio::test]
async fn insert_uses_bare_placeholders_and_generated_id() -> Result<(), SqlRecordError> {
    let client = Arc::new(RecordingMySqlClient::with_insert_id(7, ResultSet::default()));
    let db = Database::mysql(client.clone());

    let mut item = Record::<Item>::with_values([("name", "X")])?;
    item.save(&db).await?;

    let calls = client.calls();
    assert_eq!(calls[0].sql, "INSERT INTO t (name, active) VALUES (?, ?)");
    assert_eq!(
        calls[0].params,
        vec![RowValues::Text("X".into()), RowValues::Bool(true)]
    );
    assert_eq!(item.get("id")?, Some(RowValues::Int(7)));
    assert!(item.is_persisted());
    assert!(item.dirty_fields().is_empty());
    Ok(())
}

#[tokio::test]
async fn generated_key_goes_to_the_single_primary_key() -> Result<(), SqlRecordError> {
    let client = Arc::new(RecordingMySqlClient::with_insert_id(44, ResultSet::default()));
    let db = Database::mysql(client);

    let mut country = Record::<Country>::with_values([("label", "Norway")])?;
    country.insert(&db).await?;
    assert_eq!(country.get("code")?, Some(RowValues::Int(44)));
    Ok(())
}

#[tokio::test]
async fn empty_insert_renders_empty_column_list() -> Result<(), SqlRecordError> {
    let client = Arc::new(RecordingMySqlClient::with_insert_id(1, ResultSet::default()));
    let db = Database::mysql(client.clone());

    let mut rec = Record::<Empty>::new()?;
    rec.insert(&db).await?;
    assert_eq!(client.sql_log(), vec!["INSERT INTO empties () VALUES ()".to_string()]);
    Ok(())
}

#[tokio::test]
async fn update_strips_returning_and_keeps_param_order() -> Result<(), SqlRecordError> {
    let client = Arc::new(RecordingMySqlClient::with_insert_id(0, stored_item()));
    let db = Database::mysql(client.clone());

    let mut items = Record::<Item>::select(&db, "name = $1", &["X".into()]).await?;
    let item = &mut items[0];
    assert_eq!(item.get("active")?.and_then(|v| v.as_bool()), Some(true));

    item.set("field", "changed")?;
    item.set("name", "Y")?;
    item.save(&db).await?;

    let calls = client.calls();
    assert_eq!(calls[0].sql, "SELECT * FROM t WHERE name = ?");
    assert_eq!(calls[1].sql, "UPDATE t SET name = ?, field = ? WHERE id = ?");
    assert_eq!(
        calls[1].params,
        vec![
            RowValues::Text("Y".into()),
            RowValues::Text("changed".into()),
            RowValues::Int(3)
        ]
    );
    // No RETURNING on MySQL: the record keeps what it was given.
    assert_eq!(item.get("field")?, Some(RowValues::Text("changed".into())));
    Ok(())
}

#[tokio::test]
async fn out_of_order_placeholders_are_rebound() -> Result<(), SqlRecordError> {
    let client = Arc::new(RecordingMySqlClient::new());
    let db = Database::mysql(client.clone());

    db.query(
        "SELECT * FROM t WHERE a = $2 OR b = $1 OR c = '$3'",
        &[RowValues::Int(10), RowValues::Int(20)],
    )
    .await?;

    let calls = client.calls();
    assert_eq!(calls[0].sql, "SELECT * FROM t WHERE a = ? OR b = ? OR c = '$3'");
    assert_eq!(calls[0].params, vec![RowValues::Int(20), RowValues::Int(10)]);
    Ok(())
}

#[tokio::test]
async fn dangling_placeholder_is_a_parameter_error() {
    let client = Arc::new(RecordingMySqlClient::new());
    let db = Database::mysql(client.clone());

    let err = db
        .query("DELETE FROM t WHERE id = $2", &[RowValues::Int(1)])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlRecordError::Parameter { dialect: Dialect::MySql, .. }));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn callback_error_becomes_query_failed() {
    let client = Arc::new(RecordingMySqlClient::with_responder(|_, _| {
        Some(Err("ER_NO_SUCH_TABLE".into()))
    }));
    let db = Database::mysql(client);

    let err = Record::<Item>::select(&db, "", &[]).await.unwrap_err();
    assert!(err.is_query_failure());
    assert!(matches!(
        err,
        SqlRecordError::QueryFailed { dialect: Dialect::MySql, ref sql, .. } if sql == "SELECT * FROM t"
    ));
}

#[tokio::test]
async fn abandoned_callback_is_cancelled() {
    let client = Arc::new(RecordingMySqlClient::with_responder(|_, _| None));
    let db = Database::mysql(client);

    let mut item = Record::<Item>::new().unwrap();
    let err = item.insert(&db).await.unwrap_err();
    assert!(matches!(err, SqlRecordError::Cancelled { .. }));
    assert!(!item.is_persisted());
}
