//! Table façade.
//!
//! [`TableService`] pairs one registered [`Table`] with a
//! [`ConnectionFactory`]: statements come from the generator, run through
//! the execution engine on the handle for the table's logical database, and
//! come back as [`Record`]s.

use std::sync::Arc;

use chrono::Utc;
use mysqlmodel_core::{
    Connector, Error, Record, RecordError, RecordErrorKind, Result, Row, Table, TableRegistry,
    TypeError, Value, Values, WriteKind,
};
use mysqlmodel_query::{COUNT_ALIAS, Statement, StatementGenerator, UpsertBuilder};

use crate::engine::{Execution, Executor, Operation, RetryPolicy};
use crate::factory::ConnectionFactory;

/// Record-level operations on one table.
#[derive(Debug)]
pub struct TableService<'f, C: Connector> {
    table: Arc<Table>,
    factory: &'f mut ConnectionFactory<C>,
    policy: RetryPolicy,
}

impl<'f, C: Connector> TableService<'f, C> {
    pub fn new(table: Arc<Table>, factory: &'f mut ConnectionFactory<C>) -> Self {
        Self {
            table,
            factory,
            policy: RetryPolicy::default(),
        }
    }

    /// Service for a table looked up by name.
    pub fn from_registry(
        registry: &TableRegistry,
        name: &str,
        factory: &'f mut ConnectionFactory<C>,
    ) -> Result<Self> {
        let table = registry
            .get(name)
            .ok_or_else(|| Error::invalid_config(format!("table '{name}' is not registered")))?;
        Ok(Self::new(table, factory))
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// The record whose primary key matches `key`.
    pub fn by_id(&mut self, key: &Values) -> Result<Record> {
        let table = Arc::clone(&self.table);
        let stmt = StatementGenerator::new(&table).select_by_id()?;
        let mut rows = self.read(&stmt, &stmt.bind(key))?;
        match rows.len() {
            0 => Err(record_error(RecordErrorKind::NotFound, &table, &stmt)),
            1 => Ok(Record::from_row(rows.remove(0))),
            n => Err(record_error(RecordErrorKind::MultipleFound(n), &table, &stmt)),
        }
    }

    pub fn all(&mut self) -> Result<Vec<Record>> {
        let stmt = StatementGenerator::new(&self.table).select_all();
        self.read_records(&stmt, &[])
    }

    /// Records whose `field` equals `value`.
    pub fn by_field(&mut self, field: &str, value: impl Into<Value>) -> Result<Vec<Record>> {
        let stmt = StatementGenerator::new(&self.table).select_by_field(field)?;
        self.read_records(&stmt, &[value.into()])
    }

    /// Row count of the table. An empty result counts as zero.
    pub fn count(&mut self) -> Result<u64> {
        let table = Arc::clone(&self.table);
        let stmt = StatementGenerator::new(&table).count();
        let rows = self.read(&stmt, &[])?;
        match rows.as_slice() {
            [] => Ok(0),
            [row] => {
                let counter = row.get_by_name(COUNT_ALIAS);
                counter
                    .and_then(Value::as_i64)
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| {
                        Error::Type(TypeError {
                            expected: "non-negative integer",
                            actual: counter.map_or_else(
                                || "missing".to_string(),
                                |v| format!("{v:?}"),
                            ),
                            column: Some(COUNT_ALIAS.to_string()),
                        })
                    })
            }
            _ => Err(record_error(
                RecordErrorKind::MultipleFound(rows.len()),
                &table,
                &stmt,
            )),
        }
    }

    /// Insert one record; on success it carries the generated id and a
    /// fresh snapshot.
    pub fn insert(&mut self, record: &mut Record) -> Result<()> {
        let table = Arc::clone(&self.table);
        record.stamp_timestamps(&table, WriteKind::Insert, Utc::now());
        let stmt = StatementGenerator::new(&table).insert();
        let values = stmt.bind(record.values());
        let execution = self.executor()?.execute(Operation::Create, &stmt, &values)?;
        if let (Some(field), Some(id)) = (table.auto_increment_field(), execution.insert_id()) {
            record.set(field.name.clone(), Value::from(id));
        }
        record.stamp_snapshot();
        Ok(())
    }

    /// Persist every new, changed or deleted record in `records`.
    ///
    /// Writes are staged per record. Two or more staged inserts/updates
    /// without any delete collapse into one upsert when the table allows
    /// it and every new record already carries its auto-increment value;
    /// anything else runs statement by statement in one batch. Unchanged
    /// records are skipped.
    ///
    /// No staged write survives the call: on failure every record keeps its
    /// values and snapshot and can be saved again.
    ///
    /// Returns the number of records written.
    #[tracing::instrument(level = "debug", skip(self, records), fields(table = %self.table.name()))]
    pub fn update(&mut self, records: &mut Vec<Record>) -> Result<usize> {
        let table = Arc::clone(&self.table);
        let generator = StatementGenerator::new(&table);
        for record in records.iter_mut() {
            record.take_pending();
        }

        let mut plan = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let Some(kind) = WriteKind::for_status(record.status()) else {
                continue;
            };
            let stmt = match kind {
                WriteKind::Insert => generator.insert(),
                WriteKind::Update => generator.update()?,
                WriteKind::Delete => generator.delete()?,
            };
            plan.push((index, kind, stmt));
        }
        if plan.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut has_delete = false;
        let mut ids_known = true;
        for (index, kind, stmt) in &plan {
            let record = &mut records[*index];
            record.stamp_timestamps(&table, *kind, now);
            let write = stmt.stage(*kind, record.values());
            record.stage(write);

            has_delete |= *kind == WriteKind::Delete;
            if *kind == WriteKind::Insert {
                ids_known &= table
                    .auto_increment_field()
                    .is_none_or(|f| record.get(&f.name).is_some_and(|v| !v.is_null()));
            }
        }

        let result = if !has_delete && plan.len() > 1 && generator.can_use_upsert() && ids_known {
            self.upsert(&table, records)
        } else {
            self.executor()
                .and_then(|mut executor| executor.run_batch(&table, records))
        };
        if result.is_err() {
            for record in records.iter_mut() {
                record.take_pending();
            }
        }
        result
    }

    /// Delete one record.
    pub fn delete(&mut self, record: &mut Record) -> Result<()> {
        record.mark_deleted();
        let mut records = vec![record.clone()];
        self.update(&mut records)?;
        Ok(())
    }

    /// Rows of `joined` whose `joined_pk` equals `value`, joined to this
    /// table through `joined_fk`.
    pub fn join(
        &mut self,
        joined: &Table,
        joined_pk: &str,
        joined_fk: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<Record>> {
        let stmt =
            StatementGenerator::new(&self.table).first_level_join(joined, joined_pk, joined_fk)?;
        self.read_records(&stmt, &[value.into()])
    }

    fn upsert(&mut self, table: &Table, records: &mut [Record]) -> Result<usize> {
        let mut builder = UpsertBuilder::start(table)?;
        for record in records.iter().filter(|r| r.pending().is_some()) {
            builder.record(record.values());
        }
        let upsert = builder.finish()?;
        self.executor()?
            .execute(Operation::Write, &upsert.statement, &upsert.values)?;

        for record in records.iter_mut() {
            if record.take_pending().is_some() {
                record.stamp_snapshot();
            }
        }
        Ok(upsert.rows)
    }

    fn read(&mut self, stmt: &Statement, values: &[Value]) -> Result<Vec<Row>> {
        self.executor()?
            .execute(Operation::Read, stmt, values)
            .map(Execution::into_rows)
    }

    fn read_records(&mut self, stmt: &Statement, values: &[Value]) -> Result<Vec<Record>> {
        Ok(self
            .read(stmt, values)?
            .into_iter()
            .map(Record::from_row)
            .collect())
    }

    /// Executor on a live handle for the table's database.
    fn executor(&mut self) -> Result<Executor<'_, C::Driver>> {
        let driver = self.factory.keepalive(self.table.database())?;
        Ok(Executor::with_policy(driver, self.policy))
    }
}

fn record_error(kind: RecordErrorKind, table: &Table, stmt: &Statement) -> Error {
    Error::Record(RecordError {
        kind,
        table: table.name().to_string(),
        sql: stmt.sql().to_string(),
    })
}
