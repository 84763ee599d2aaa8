use super::{ParamList, Statement};
use crate::error::SqlRecordError;
use crate::record::Record;
use crate::schema::Model;
use crate::types::RowValues;

/// Dirty, writable fields in declaration order: no primary keys, no computed fields.
fn writable_dirty<M: Model>(record: &Record<M>) -> Vec<(&str, RowValues)> {
    let metadata = &record.schema().metadata;
    record
        .schema()
        .spec
        .iter()
        .filter(|(name, spec)| {
            record.is_dirty(name) && !spec.is_computed() && !metadata.is_primary_key(name)
        })
        .map(|(name, _)| (name, record.raw(name).cloned().unwrap_or(RowValues::Null)))
        .collect()
}

fn is_missing(value: Option<&RowValues>) -> bool {
    value.is_none_or(RowValues::is_null)
}

fn check_required<'a, M: Model>(
    record: &Record<M>,
    mut fields: impl Iterator<Item = &'a String>,
) -> Result<(), SqlRecordError> {
    match fields.find(|name| is_missing(record.raw(name))) {
        Some(name) => Err(SqlRecordError::required_missing(record.table(), name)),
        None => Ok(()),
    }
}

fn primary_key_filter<M: Model>(
    record: &Record<M>,
    params: &mut ParamList,
) -> Result<String, SqlRecordError> {
    let mut clauses = Vec::new();
    for pk in &record.schema().metadata.primary_keys {
        let Some(value) = record.raw(pk).filter(|v| !v.is_null()) else {
            return Err(SqlRecordError::required_missing(record.table(), pk));
        };
        clauses.push(format!("{pk} = {}", params.bind(value.clone())));
    }
    Ok(clauses.join(" AND "))
}

/// `INSERT INTO <table> (<dirty fields>) VALUES (<placeholders>) RETURNING *`.
///
/// With nothing to write the statement falls back to `DEFAULT VALUES`.
///
/// # Errors
/// Returns `RequiredFieldMissing` when a required field is absent or `NULL`.
pub fn build_insert<M: Model>(record: &Record<M>) -> Result<Statement, SqlRecordError> {
    check_required(record, record.schema().metadata.required_fields.iter())?;

    let fields = writable_dirty(record);
    if fields.is_empty() {
        return Ok(Statement::without_params(format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING *",
            record.table()
        )));
    }

    let mut params = ParamList::default();
    let mut columns = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        columns.push(name);
        placeholders.push(params.bind(value));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        record.table(),
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(Statement::new(sql, params.into_params()))
}

/// `UPDATE <table> SET <dirty fields> WHERE <primary keys> RETURNING *`.
///
/// Returns `Ok(None)` when nothing is dirty: an update without a SET list is a no-op.
///
/// # Errors
/// Returns `RequiredFieldMissing` when a dirty required field or a primary key has no value.
pub fn build_update<M: Model>(record: &Record<M>) -> Result<Option<Statement>, SqlRecordError> {
    let metadata = &record.schema().metadata;
    check_required(
        record,
        metadata
            .required_fields
            .iter()
            .filter(|name| record.is_dirty(name) || metadata.is_primary_key(name)),
    )?;

    let fields = writable_dirty(record);
    if fields.is_empty() {
        return Ok(None);
    }

    let mut params = ParamList::default();
    let assignments: Vec<String> = fields
        .into_iter()
        .map(|(name, value)| format!("{name} = {}", params.bind(value)))
        .collect();
    let filter = primary_key_filter(record, &mut params)?;

    let sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING *",
        record.table(),
        assignments.join(", "),
        filter
    );
    Ok(Some(Statement::new(sql, params.into_params())))
}

/// `DELETE FROM <table> WHERE <primary keys>`.
///
/// # Errors
/// Returns `RequiredFieldMissing` when a primary key has no value.
pub fn build_delete<M: Model>(record: &Record<M>) -> Result<Statement, SqlRecordError> {
    let mut params = ParamList::default();
    let filter = primary_key_filter(record, &mut params)?;
    let sql = format!("DELETE FROM {} WHERE {}", record.table(), filter);
    Ok(Statement::new(sql, params.into_params()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::results::CustomDbRow;
    use crate::schema::{FieldSpec, SchemaSpec};

    struct Admin;
    impl Model for Admin {
        fn schema() -> SchemaSpec {
            SchemaSpec::new("admin")
                .field("id", FieldSpec::new().primary_key())
                .field("name", FieldSpec::new().default_value("TEST NAME"))
                .field("surname", FieldSpec::new())
                .field("ctime", FieldSpec::new().default_value(RowValues::Int(0)))
                .field(
                    "full_name",
                    FieldSpec::new().computed().getter(|_, _, _| None),
                )
        }
    }

    struct Membership;
    impl Model for Membership {
        fn schema() -> SchemaSpec {
            SchemaSpec::new("membership")
                .field("org_id", FieldSpec::new().primary_key())
                .field("user_id", FieldSpec::new().primary_key())
                .field("role", FieldSpec::new().required())
        }
    }

    fn loaded_admin() -> Record<Admin> {
        let row = CustomDbRow::new(
            Arc::new(vec!["id".into(), "name".into(), "surname".into()]),
            vec![
                RowValues::Int(1),
                RowValues::Text("TestName".into()),
                RowValues::Text("TestSurname".into()),
            ],
        );
        Record::from_row(&row).unwrap()
    }

    #[test]
    fn insert_lists_dirty_fields_in_schema_order() {
        let rec = Record::<Admin>::with_values([("surname", "S"), ("name", "N")]).unwrap();
        let stmt = build_insert(&rec).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO admin (name, surname, ctime) VALUES ($1, $2, $3) RETURNING *"
        );
        assert_eq!(
            stmt.params,
            vec![
                RowValues::Text("N".into()),
                RowValues::Text("S".into()),
                RowValues::Int(0)
            ]
        );
    }

    #[test]
    fn insert_skips_keys_and_computed_fields() {
        let mut rec = Record::<Admin>::new().unwrap();
        rec.set("id", 9_i64).unwrap();
        rec.set("full_name", "ignored").unwrap();
        let stmt = build_insert(&rec).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO admin (name, ctime) VALUES ($1, $2) RETURNING *"
        );
    }

    #[test]
    fn insert_requires_required_fields() {
        let rec = Record::<Membership>::with_values([("org_id", 1_i64)]).unwrap();
        let err = build_insert(&rec).unwrap_err();
        assert!(
            matches!(err, SqlRecordError::RequiredFieldMissing { ref field, .. } if field == "role")
        );
    }

    #[test]
    fn insert_with_nothing_dirty_uses_default_values() {
        let mut rec = Record::<Membership>::new().unwrap();
        rec.set("role", "admin").unwrap();
        rec.clear_dirty();
        let stmt = build_insert(&rec).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO membership DEFAULT VALUES RETURNING *");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn update_sets_only_dirty_fields_then_keys() {
        let mut rec = loaded_admin();
        rec.set("surname", "New").unwrap();
        let stmt = build_update(&rec).unwrap().unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE admin SET surname = $1 WHERE id = $2 RETURNING *"
        );
        assert_eq!(
            stmt.params,
            vec![RowValues::Text("New".into()), RowValues::Int(1)]
        );
    }

    #[test]
    fn update_leaves_dirty_computed_fields_out() {
        let mut rec = loaded_admin();
        rec.set("full_name", "Someone Else").unwrap();
        assert!(rec.is_dirty("full_name"));
        assert!(build_update(&rec).unwrap().is_none());

        rec.set("surname", "New").unwrap();
        let stmt = build_update(&rec).unwrap().unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE admin SET surname = $1 WHERE id = $2 RETURNING *"
        );
        assert_eq!(
            stmt.params,
            vec![RowValues::Text("New".into()), RowValues::Int(1)]
        );
    }

    #[test]
    fn update_without_dirty_fields_is_none() {
        let rec = loaded_admin();
        assert!(build_update(&rec).unwrap().is_none());
    }

    #[test]
    fn update_needs_primary_key_values() {
        let mut rec = Record::<Admin>::new().unwrap();
        rec.set("surname", "x").unwrap();
        let err = build_update(&rec).unwrap_err();
        assert!(
            matches!(err, SqlRecordError::RequiredFieldMissing { ref field, .. } if field == "id")
        );
    }

    #[test]
    fn composite_keys_are_anded() {
        let mut rec = Record::<Membership>::with_values([
            ("org_id", RowValues::Int(3)),
            ("user_id", RowValues::Int(4)),
            ("role", RowValues::Text("owner".into())),
        ])
        .unwrap();
        let stmt = build_update(&rec).unwrap().unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE membership SET role = $1 WHERE org_id = $2 AND user_id = $3 RETURNING *"
        );

        rec.clear_dirty();
        let stmt = build_delete(&rec).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM membership WHERE org_id = $1 AND user_id = $2");
        assert_eq!(stmt.params, vec![RowValues::Int(3), RowValues::Int(4)]);
    }

    #[test]
    fn dirty_required_field_set_to_null_fails_update() {
        let mut rec = Record::<Membership>::with_values([
            ("org_id", RowValues::Int(3)),
            ("user_id", RowValues::Int(4)),
        ])
        .unwrap();
        rec.set("role", RowValues::Null).unwrap();
        assert!(matches!(
            build_update(&rec),
            Err(SqlRecordError::RequiredFieldMissing { .. })
        ));
    }
}
