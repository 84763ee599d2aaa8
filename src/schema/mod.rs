//! Declarative field maps for record types.
//!
//! A record type implements [`Model`] and returns its [`SchemaSpec`]: the backing table,
//! one [`FieldSpec`] per column in declaration order, and whether unknown field names are
//! rejected. The schema is read once per type by the [`registry`].
//!
//! ```rust
//! use sql_record::prelude::*;
//!
//! struct Admin;
//!
//! impl Model for Admin {
//!     fn schema() -> SchemaSpec {
//!         SchemaSpec::new("admin")
//!             .field("id", FieldSpec::new().primary_key())
//!             .field("name", FieldSpec::new().default_value("TEST NAME"))
//!             .field("surname", FieldSpec::new())
//!     }
//! }
//! # let _ = Admin::schema();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::record::FieldValues;
use crate::types::RowValues;

pub mod registry;

pub use registry::{RecordSchema, RecordTypeMetadata};

/// Read transform: `(stored, all stored fields, field name) -> value`.
pub type FieldGetter =
    Arc<dyn Fn(Option<&RowValues>, &FieldValues, &str) -> Option<RowValues> + Send + Sync>;

/// Write transform: `(input, all stored fields, field name) -> value to store`.
pub type FieldSetter = Arc<dyn Fn(RowValues, &FieldValues, &str) -> RowValues + Send + Sync>;

/// A field default, materialized into storage when a record is constructed.
#[derive(Clone)]
pub enum DefaultValue {
    Value(RowValues),
    /// Evaluated per construction, e.g. a creation timestamp.
    Generated(Arc<dyn Fn() -> RowValues + Send + Sync>),
}

impl DefaultValue {
    #[must_use]
    pub fn resolve(&self) -> RowValues {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Generated(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Generated(_) => f.write_str("Generated(..)"),
        }
    }
}

/// Static descriptor of one field. Built with chained setters and immutable afterwards.
#[derive(Clone, Default)]
pub struct FieldSpec {
    pub(crate) primary_key: bool,
    pub(crate) required: bool,
    pub(crate) computed: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) getter: Option<FieldGetter>,
    pub(crate) setter: Option<FieldSetter>,
}

impl FieldSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Computed fields are never written by INSERT or UPDATE.
    #[must_use]
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<RowValues>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    #[must_use]
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> RowValues + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generated(Arc::new(f)));
        self
    }

    #[must_use]
    pub fn getter<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&RowValues>, &FieldValues, &str) -> Option<RowValues> + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(RowValues, &FieldValues, &str) -> RowValues + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.computed
    }

    #[must_use]
    pub fn declared_default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("primary_key", &self.primary_key)
            .field("required", &self.required)
            .field("computed", &self.computed)
            .field("default", &self.default)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// Field map of one record type, plus its table and validation flag.
#[derive(Debug, Clone)]
pub struct SchemaSpec {
    table: String,
    validate: bool,
    fields: Vec<(String, FieldSpec)>,
    index: HashMap<String, usize>,
}

impl SchemaSpec {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            validate: true,
            fields: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Declare a field. Re-declaring a name replaces its spec and keeps its position.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        if let Some(&pos) = self.index.get(&name) {
            self.fields[pos].1 = spec;
        } else {
            self.index.insert(name.clone(), self.fields.len());
            self.fields.push((name, spec));
        }
        self
    }

    /// Opt out of field-name validation: unknown names are stored but never written.
    #[must_use]
    pub fn skip_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn validates(&self) -> bool {
        self.validate
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&i| &self.fields[i].1)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A record type: something with a declared schema.
pub trait Model: 'static {
    fn schema() -> SchemaSpec;
}
