use super::Record;
use crate::error::SqlRecordError;
use crate::executor::StatementExecutor;
use crate::query_builder::{build_delete, build_insert, build_select, build_update};
use crate::results::QueryOutput;
use crate::schema::{Model, RecordSchema};
use crate::types::RowValues;

impl<M: Model> Record<M> {
    /// Insert the record's dirty fields.
    ///
    /// A returned row (`RETURNING *`) is written back into the record; otherwise a key
    /// reported by the client goes to the `id` field, or to the only primary key.
    ///
    /// Once the server accepts the row the record counts as persisted and clean, even if
    /// writing the returned row back fails.
    ///
    /// # Errors
    /// `RequiredFieldMissing` before anything is sent, the executor's failure, or
    /// `SchemaViolation` when the returned row carries an undeclared column.
    pub async fn insert<E>(&mut self, executor: &E) -> Result<&mut Self, SqlRecordError>
    where
        E: StatementExecutor + ?Sized,
    {
        let statement = build_insert(self)?;
        let output = executor.execute(&statement).await?;
        self.clear_dirty();
        self.set_persisted(true);
        self.absorb(&output)?;
        if output.result_set.is_empty()
            && let Some(key) = output.generated_key
            && let Some(field) = self.generated_key_field()
        {
            self.force_set(&field, key)?;
        }
        Ok(self)
    }

    /// Write the dirty fields of a persisted record. Nothing is sent when nothing is dirty.
    ///
    /// # Errors
    /// `RequiredFieldMissing` before anything is sent, the executor's failure, or
    /// `SchemaViolation` when the returned row carries an undeclared column.
    pub async fn update<E>(&mut self, executor: &E) -> Result<&mut Self, SqlRecordError>
    where
        E: StatementExecutor + ?Sized,
    {
        let Some(statement) = build_update(self)? else {
            tracing::trace!(table = self.table(), "no dirty fields, update skipped");
            return Ok(self);
        };
        let output = executor.execute(&statement).await?;
        self.clear_dirty();
        self.set_persisted(true);
        self.absorb(&output)?;
        Ok(self)
    }

    /// Delete the row identified by the primary key values.
    ///
    /// # Errors
    /// `RequiredFieldMissing` when a key has no value, or the executor's failure.
    pub async fn delete<E>(&mut self, executor: &E) -> Result<&mut Self, SqlRecordError>
    where
        E: StatementExecutor + ?Sized,
    {
        let statement = build_delete(self)?;
        executor.execute(&statement).await?;
        self.set_persisted(false);
        Ok(self)
    }

    /// [`update`](Self::update) a persisted record, [`insert`](Self::insert) a new one.
    ///
    /// # Errors
    /// As the routed operation.
    pub async fn save<E>(&mut self, executor: &E) -> Result<&mut Self, SqlRecordError>
    where
        E: StatementExecutor + ?Sized,
    {
        if self.is_persisted() {
            self.update(executor).await
        } else {
            self.insert(executor).await
        }
    }

    /// Fetch every row of `M`'s table matching `where_fragment`, one persisted record each.
    ///
    /// `where_fragment` is raw SQL with `$n` placeholders bound to `values`.
    ///
    /// # Errors
    /// `Configuration` for a bad schema, `SchemaViolation` for foreign columns, or the
    /// executor's failure.
    pub async fn select<E>(
        executor: &E,
        where_fragment: &str,
        values: &[RowValues],
    ) -> Result<Vec<Self>, SqlRecordError>
    where
        E: StatementExecutor + ?Sized,
    {
        let schema = RecordSchema::of::<M>()?;
        let statement = build_select(schema.table(), where_fragment, values);
        let output = executor.execute(&statement).await?;
        output.result_set.results.iter().map(Self::from_row).collect()
    }

    /// Re-hydrate from the first returned row, if any.
    fn absorb(&mut self, output: &QueryOutput) -> Result<(), SqlRecordError> {
        if let Some(row) = output.result_set.first() {
            self.hydrate(row)?;
        }
        Ok(())
    }

    fn generated_key_field(&self) -> Option<String> {
        let schema = self.schema();
        if schema.spec.contains("id") {
            return Some("id".to_string());
        }
        match schema.metadata.primary_keys.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }
}
