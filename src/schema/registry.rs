use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use super::{Model, SchemaSpec};
use crate::error::SqlRecordError;

type RegistryMap = LazyLock<Mutex<HashMap<TypeId, Arc<RecordSchema>>>>;

static REGISTRY: RegistryMap = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Metadata derived once per record type. Each list keeps schema declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTypeMetadata {
    pub primary_keys: Vec<String>,
    pub required_fields: Vec<String>,
    pub default_fields: Vec<String>,
}

impl RecordTypeMetadata {
    /// Derive metadata from a schema.
    ///
    /// # Errors
    /// Returns `SqlRecordError::Configuration` when the schema declares no fields or no
    /// primary key.
    pub fn derive(record_type: &str, spec: &SchemaSpec) -> Result<Self, SqlRecordError> {
        if spec.is_empty() {
            return Err(SqlRecordError::Configuration {
                record_type: record_type.to_string(),
                reason: "schema declares no fields".to_string(),
            });
        }

        let mut metadata = RecordTypeMetadata {
            primary_keys: Vec::new(),
            required_fields: Vec::new(),
            default_fields: Vec::new(),
        };
        for (name, field) in spec.iter() {
            if field.primary_key {
                metadata.primary_keys.push(name.to_string());
            }
            if field.required {
                metadata.required_fields.push(name.to_string());
            }
            if field.default.is_some() {
                metadata.default_fields.push(name.to_string());
            }
        }

        if metadata.primary_keys.is_empty() {
            return Err(SqlRecordError::Configuration {
                record_type: record_type.to_string(),
                reason: format!(
                    "table `{}` has no primary key; mark one field with FieldSpec::primary_key()",
                    spec.table()
                ),
            });
        }

        Ok(metadata)
    }

    #[must_use]
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_keys.iter().any(|pk| pk == name)
    }
}

/// A record type's schema paired with its derived metadata.
#[derive(Debug)]
pub struct RecordSchema {
    pub spec: SchemaSpec,
    pub metadata: RecordTypeMetadata,
}

impl RecordSchema {
    /// Resolve the cached schema of `M`, deriving it on first use.
    ///
    /// Failures are not cached, so a misconfigured type fails every time it is used.
    ///
    /// # Errors
    /// Returns `SqlRecordError::Configuration` when `M`'s schema is unusable.
    pub fn of<M: Model>() -> Result<Arc<RecordSchema>, SqlRecordError> {
        let key = TypeId::of::<M>();
        if let Some(found) = lock_registry().get(&key) {
            return Ok(found.clone());
        }

        // Derive outside the lock; `M::schema()` is user code.
        let spec = M::schema();
        let metadata = RecordTypeMetadata::derive(type_name::<M>(), &spec)?;
        tracing::debug!(
            record_type = type_name::<M>(),
            table = spec.table(),
            primary_keys = ?metadata.primary_keys,
            "registered record type"
        );
        let derived = Arc::new(RecordSchema { spec, metadata });

        let mut registry = lock_registry();
        Ok(registry.entry(key).or_insert(derived).clone())
    }

    #[must_use]
    pub fn table(&self) -> &str {
        self.spec.table()
    }
}

fn lock_registry() -> std::sync::MutexGuard<'static, HashMap<TypeId, Arc<RecordSchema>>> {
    match REGISTRY.lock() {
        Ok(guard) => guard,
        // Entries are inserted whole, so a poisoned map is still consistent.
        Err(poisoned) => poisoned.into_inner(),
    }
}
