//! Record instances: schema-checked field storage with dirty tracking.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::error::SqlRecordError;
use crate::results::CustomDbRow;
use crate::schema::{Model, RecordSchema};
use crate::types::RowValues;

mod persist;

/// Raw stored values of one record, keyed by field name.
///
/// Getters and setters receive this view of their siblings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    values: HashMap<String, RowValues>,
}

impl FieldValues {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        self.values.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, name: &str, value: RowValues) {
        self.values.insert(name.to_string(), value);
    }
}

/// One instance of record type `M`.
///
/// Reads and writes go through [`get`](Record::get) and [`set`](Record::set), which check the
/// name against the schema and apply the field's getter or setter. Every `set` marks the
/// field dirty; the next insert or update writes exactly the dirty, non-key, non-computed
/// fields and then clears the dirty set.
pub struct Record<M: Model> {
    schema: Arc<RecordSchema>,
    values: FieldValues,
    // Names outside the schema, in first-write order (validation opted out)
    extra: Vec<String>,
    dirty: HashSet<String>,
    persisted: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Record<M> {
    /// A fresh record with every declared default materialized.
    ///
    /// Defaults bypass setters but are marked dirty, so the first insert carries them.
    ///
    /// # Errors
    /// Returns `SqlRecordError::Configuration` if `M` has no usable schema.
    pub fn new() -> Result<Self, SqlRecordError> {
        let schema = RecordSchema::of::<M>()?;
        let mut record = Record {
            schema,
            values: FieldValues::default(),
            extra: Vec::new(),
            dirty: HashSet::new(),
            persisted: false,
            _model: PhantomData,
        };

        let schema = record.schema.clone();
        for name in &schema.metadata.default_fields {
            if let Some(default) = schema.spec.get(name).and_then(|f| f.default.as_ref()) {
                record.values.insert(name, default.resolve());
                record.dirty.insert(name.clone());
            }
        }

        Ok(record)
    }

    /// A fresh record with defaults, then `values` assigned through [`set`](Record::set).
    ///
    /// # Errors
    /// Returns `SchemaViolation` for an undeclared name, or `Configuration` for a bad schema.
    pub fn with_values<I, K, V>(values: I) -> Result<Self, SqlRecordError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RowValues>,
    {
        let mut record = Self::new()?;
        for (name, value) in values {
            record.set(name.as_ref(), value)?;
        }
        Ok(record)
    }

    /// Build a persisted record from a fetched row. Every column is force-written.
    ///
    /// # Errors
    /// Returns `SchemaViolation` when a column is not declared and the type validates.
    pub fn from_row(row: &CustomDbRow) -> Result<Self, SqlRecordError> {
        let schema = RecordSchema::of::<M>()?;
        let mut record = Record {
            schema,
            values: FieldValues::default(),
            extra: Vec::new(),
            dirty: HashSet::new(),
            persisted: true,
            _model: PhantomData,
        };
        record.hydrate(row)?;
        Ok(record)
    }

    /// Read a field through its getter, if one is declared.
    ///
    /// `Ok(None)` means the field holds no value.
    ///
    /// # Errors
    /// Returns `SchemaViolation` for an undeclared name unless validation is opted out.
    pub fn get(&self, name: &str) -> Result<Option<RowValues>, SqlRecordError> {
        self.check_name(name)?;
        let stored = self.values.get(name);
        match self.schema.spec.get(name).and_then(|f| f.getter.as_ref()) {
            Some(getter) => Ok(getter(stored, &self.values, name)),
            None => Ok(stored.cloned()),
        }
    }

    /// Assign a field through its setter and mark it dirty.
    ///
    /// # Errors
    /// Returns `SchemaViolation` for an undeclared name unless validation is opted out.
    pub fn set(&mut self, name: &str, value: impl Into<RowValues>) -> Result<(), SqlRecordError> {
        self.check_name(name)?;
        let value = value.into();
        let value = match self.schema.spec.get(name).and_then(|f| f.setter.as_ref()) {
            Some(setter) => setter(value, &self.values, name),
            None => value,
        };
        self.store(name, value);
        if self.schema.spec.contains(name) {
            self.dirty.insert(name.to_string());
        }
        Ok(())
    }

    /// Store a value verbatim: no setter, no dirty mark.
    pub(crate) fn force_set(&mut self, name: &str, value: RowValues) -> Result<(), SqlRecordError> {
        self.check_name(name)?;
        self.store(name, value);
        Ok(())
    }

    /// Force-write every column of `row` into storage. Nothing is written unless every
    /// column is declared.
    pub(crate) fn hydrate(&mut self, row: &CustomDbRow) -> Result<(), SqlRecordError> {
        for (column, _) in row.iter() {
            self.check_name(column)?;
        }
        for (column, value) in row.iter() {
            self.store(column, value.clone());
        }
        Ok(())
    }

    fn store(&mut self, name: &str, value: RowValues) {
        if !self.schema.spec.contains(name) && !self.values.contains(name) {
            self.extra.push(name.to_string());
        }
        self.values.insert(name, value);
    }

    fn check_name(&self, name: &str) -> Result<(), SqlRecordError> {
        if self.schema.spec.validates() && !self.schema.spec.contains(name) {
            return Err(SqlRecordError::schema_violation(self.table(), name));
        }
        Ok(())
    }

    /// The stored value, ignoring any getter.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&RowValues> {
        self.values.get(name)
    }

    #[must_use]
    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    #[must_use]
    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    /// Dirty field names in schema declaration order.
    #[must_use]
    pub fn dirty_fields(&self) -> Vec<&str> {
        self.schema
            .spec
            .iter()
            .map(|(name, _)| name)
            .filter(|name| self.dirty.contains(*name))
            .collect()
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    #[must_use]
    pub fn table(&self) -> &str {
        self.schema.table()
    }

    #[must_use]
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Every readable field as a JSON object: schema fields through their getters, then
    /// undeclared fields as stored. Absent fields are omitted.
    ///
    /// # Errors
    /// Propagates errors from [`get`](Record::get).
    pub fn to_json(&self) -> Result<JsonValue, SqlRecordError> {
        let mut object = Map::new();
        let names = self
            .schema
            .spec
            .iter()
            .map(|(name, _)| name)
            .chain(self.extra.iter().map(String::as_str));
        for name in names {
            if let Some(value) = self.get(name)? {
                object.insert(name.to_string(), value.to_json());
            }
        }
        Ok(JsonValue::Object(object))
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    pub(crate) fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }
}

impl<M: Model> Clone for Record<M> {
    fn clone(&self) -> Self {
        Record {
            schema: self.schema.clone(),
            values: self.values.clone(),
            extra: self.extra.clone(),
            dirty: self.dirty.clone(),
            persisted: self.persisted,
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table())
            .field("values", &self.values)
            .field("dirty", &self.dirty_fields())
            .field("persisted", &self.persisted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, SchemaSpec};

    struct Admin;
    impl Model for Admin {
        fn schema() -> SchemaSpec {
            SchemaSpec::new("admin")
                .field("id", FieldSpec::new().primary_key())
                .field("name", FieldSpec::new().default_value("TEST NAME"))
                .field("surname", FieldSpec::new())
                .field(
                    "email",
                    FieldSpec::new().setter(|v, _, _| match v {
                        RowValues::Text(s) => RowValues::Text(s.trim().to_lowercase()),
                        other => other,
                    }),
                )
                .field(
                    "full_name",
                    FieldSpec::new()
                        .computed()
                        .getter(|_, fields, _| {
                            let part = |n: &str| {
                                fields
                                    .get(n)
                                    .and_then(RowValues::as_text)
                                    .unwrap_or_default()
                                    .to_string()
                            };
                            Some(RowValues::Text(format!("{} {}", part("name"), part("surname"))))
                        })
                        .setter(|_, fields, name| {
                            fields.get(name).cloned().unwrap_or(RowValues::Null)
                        }),
                )
        }
    }

    struct Loose;
    impl Model for Loose {
        fn schema() -> SchemaSpec {
            SchemaSpec::new("loose")
                .field("id", FieldSpec::new().primary_key())
                .skip_validation()
        }
    }

    #[test]
    fn defaults_are_materialized_and_dirty() {
        let rec = Record::<Admin>::new().unwrap();
        assert_eq!(rec.get("name").unwrap(), Some(RowValues::Text("TEST NAME".into())));
        assert_eq!(rec.dirty_fields(), ["name"]);
        assert_eq!(rec.get("surname").unwrap(), None);
        assert!(!rec.is_persisted());
    }

    #[test]
    fn setter_transforms_and_marks_dirty() {
        let mut rec = Record::<Admin>::new().unwrap();
        rec.set("email", "  Bob@Example.COM ").unwrap();
        assert_eq!(
            rec.get("email").unwrap(),
            Some(RowValues::Text("bob@example.com".into()))
        );
        assert_eq!(rec.dirty_fields(), ["name", "email"]);
    }

    #[test]
    fn computed_getter_reads_siblings() {
        let rec = Record::<Admin>::with_values([("name", "Ada"), ("surname", "Lovelace")]).unwrap();
        assert_eq!(
            rec.get("full_name").unwrap(),
            Some(RowValues::Text("Ada Lovelace".into()))
        );
    }

    #[test]
    fn unknown_field_is_a_schema_violation() {
        let mut rec = Record::<Admin>::new().unwrap();
        assert!(matches!(
            rec.set("nickname", "x"),
            Err(SqlRecordError::SchemaViolation { .. })
        ));
        assert!(matches!(
            rec.get("nickname"),
            Err(SqlRecordError::SchemaViolation { .. })
        ));
        assert_eq!(rec.dirty_fields(), ["name"]);
    }

    #[test]
    fn skipped_validation_stores_unknown_fields_without_dirtying() {
        let mut rec = Record::<Loose>::new().unwrap();
        rec.set("anything", 5_i64).unwrap();
        assert_eq!(rec.get("anything").unwrap(), Some(RowValues::Int(5)));
        assert!(rec.dirty_fields().is_empty());
        assert_eq!(rec.to_json().unwrap(), serde_json::json!({"anything": 5}));
    }

    #[test]
    fn from_row_is_forced_and_persisted() {
        let row = CustomDbRow::new(
            Arc::new(vec!["id".into(), "email".into()]),
            vec![RowValues::Int(7), RowValues::Text("RAW@X".into())],
        );
        let rec = Record::<Admin>::from_row(&row).unwrap();
        assert!(rec.is_persisted());
        assert!(rec.dirty_fields().is_empty());
        // Setter is bypassed on hydration
        assert_eq!(rec.raw("email"), Some(&RowValues::Text("RAW@X".into())));
    }

    #[test]
    fn from_row_rejects_undeclared_columns() {
        let row = CustomDbRow::new(Arc::new(vec!["nickname".into()]), vec![RowValues::Null]);
        assert!(matches!(
            Record::<Admin>::from_row(&row),
            Err(SqlRecordError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn hydration_with_an_undeclared_column_writes_nothing() {
        let mut rec = Record::<Admin>::with_values([("surname", "Old")]).unwrap();
        let row = CustomDbRow::new(
            Arc::new(vec!["id".into(), "surname".into(), "nickname".into()]),
            vec![RowValues::Int(3), RowValues::Text("New".into()), RowValues::Null],
        );
        assert!(matches!(
            rec.hydrate(&row),
            Err(SqlRecordError::SchemaViolation { .. })
        ));
        assert_eq!(rec.raw("id"), None);
        assert_eq!(rec.raw("surname"), Some(&RowValues::Text("Old".into())));
    }

    #[test]
    fn to_json_uses_getters() {
        let rec = Record::<Admin>::with_values([("surname", "Hopper")]).unwrap();
        let json = rec.to_json().unwrap();
        assert_eq!(json["full_name"], "TEST NAME Hopper");
        assert_eq!(json["surname"], "Hopper");
        assert!(json.get("id").is_none());
    }
}
