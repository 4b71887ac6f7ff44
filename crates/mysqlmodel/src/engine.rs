//! Execution engine.
//!
//! Every call runs inside an autocommit bracket:
//!
//! ```text
//! SET autocommit=0 -> prepare -> execute -> [fetch] -> close -> SET autocommit=1
//! ```
//!
//! A failure anywhere in the bracket rolls the transaction back before the
//! error reaches the caller. Lock wait timeouts on execute are the one
//! condition recovered locally: the statement is closed, the thread sleeps
//! for [`RetryPolicy::delay`] and the prepare/execute pair is retried.

use std::thread;
use std::time::Duration;

use mysqlmodel_core::{
    BindType, Driver, DriverError, Error, Record, Result, Row, StatementErrorKind, Table, Value,
    WriteKind,
};
use mysqlmodel_query::Statement;

/// Retry budget for lock wait timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Pause before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

/// What a statement does, which decides what its execution returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Rows are fetched
    Read,
    /// The generated auto-increment id is reported
    Create,
    /// The affected row count is reported
    Write,
}

impl Operation {
    fn for_write(kind: WriteKind) -> Self {
        match kind {
            WriteKind::Insert => Operation::Create,
            WriteKind::Update | WriteKind::Delete => Operation::Write,
        }
    }
}

/// Outcome of one statement.
#[derive(Debug, Clone)]
pub enum Execution {
    Rows(Vec<Row>),
    Inserted { insert_id: u64 },
    Done { affected_rows: u64 },
}

impl Execution {
    /// Fetched rows; empty for writes.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Execution::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    /// Generated auto-increment id, if the statement produced one.
    pub fn insert_id(&self) -> Option<u64> {
        match self {
            Execution::Inserted { insert_id } if *insert_id > 0 => Some(*insert_id),
            _ => None,
        }
    }
}

/// Runs statements on a borrowed driver.
#[derive(Debug)]
pub struct Executor<'d, D: Driver> {
    driver: &'d mut D,
    policy: RetryPolicy,
}

impl<'d, D: Driver> Executor<'d, D> {
    pub fn new(driver: &'d mut D) -> Self {
        Self::with_policy(driver, RetryPolicy::default())
    }

    pub fn with_policy(driver: &'d mut D, policy: RetryPolicy) -> Self {
        Self { driver, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute a generated statement with values for its bind spec.
    pub fn execute(
        &mut self,
        operation: Operation,
        statement: &Statement,
        values: &[Value],
    ) -> Result<Execution> {
        let types = statement.bind_spec().bind_types();
        self.execute_sql(operation, statement.sql(), &types, values)
    }

    /// Execute SQL text with explicit bind types.
    #[tracing::instrument(level = "debug", skip(self, types, values))]
    pub fn execute_sql(
        &mut self,
        operation: Operation,
        sql: &str,
        types: &[BindType],
        values: &[Value],
    ) -> Result<Execution> {
        self.bracket(|this| this.run(operation, sql, types, values))
    }

    /// Execute the writes staged on `records` inside one autocommit bracket.
    ///
    /// Records without a staged write are left alone. On success every
    /// record whose write ran has it cleared; inserted records receive the
    /// generated id in the table's auto-increment field, deleted records
    /// are removed from `records` and written ones get a fresh snapshot.
    /// On failure the bracket is rolled back and every staged write is
    /// dropped, leaving values and snapshots as they were.
    ///
    /// Returns the number of statements executed.
    #[tracing::instrument(level = "debug", skip(self, table, records), fields(table = %table.name()))]
    pub fn run_batch(&mut self, table: &Table, records: &mut Vec<Record>) -> Result<usize> {
        let outcome = self.bracket(|this| {
            let mut ran = Vec::new();
            for (index, record) in records.iter().enumerate() {
                let Some(write) = record.pending() else {
                    continue;
                };
                let types = BindType::parse_prefix(&write.types);
                let execution =
                    this.run(Operation::for_write(write.kind), &write.sql, &types, &write.values)?;
                ran.push((index, execution.insert_id()));
            }
            Ok(ran)
        });
        let ran = match outcome {
            Ok(ran) => ran,
            Err(e) => {
                for record in records.iter_mut() {
                    record.take_pending();
                }
                return Err(e);
            }
        };

        let auto_increment = table.auto_increment_field().map(|f| f.name.clone());
        let mut deleted = Vec::new();
        for (index, insert_id) in &ran {
            let record = &mut records[*index];
            match record.take_pending().map(|w| w.kind) {
                Some(WriteKind::Delete) => deleted.push(*index),
                Some(WriteKind::Insert) => {
                    if let (Some(name), Some(id)) = (&auto_increment, insert_id) {
                        record.set(name.clone(), Value::from(*id));
                    }
                    record.stamp_snapshot();
                }
                _ => record.stamp_snapshot(),
            }
        }
        if !deleted.is_empty() {
            let mut index = 0;
            records.retain(|_| {
                let keep = !deleted.contains(&index);
                index += 1;
                keep
            });
        }

        tracing::debug!(statements = ran.len(), "batch committed");
        Ok(ran.len())
    }

    /// Run `work` with autocommit off, rolling back if anything fails.
    fn bracket<T>(&mut self, work: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = match self.set_autocommit(false) {
            Ok(()) => work(&mut *self),
            Err(e) => Err(e),
        };
        let result = match result {
            Ok(value) => self.set_autocommit(true).map(|()| value),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.rollback();
        }
        result
    }

    /// Prepare, execute, fetch and close, retrying on lock wait timeouts.
    fn run(
        &mut self,
        operation: Operation,
        sql: &str,
        types: &[BindType],
        values: &[Value],
    ) -> Result<Execution> {
        tracing::debug!(sql = %sql, params = values.len(), "executing statement");
        let mut retries = 0;
        loop {
            let mut stmt = self
                .driver
                .prepare(sql)
                .map_err(|e| statement_error(StatementErrorKind::Prepare, sql, e))?;

            match self.driver.execute(&mut stmt, types, values) {
                Ok(()) => return self.finish(operation, sql, stmt),
                Err(e) if e.is_lock_wait_timeout() && retries < self.policy.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        sql = %sql,
                        attempt = retries,
                        max_retries = self.policy.max_retries,
                        "lock wait timeout, retrying"
                    );
                    self.driver
                        .close(stmt)
                        .map_err(|e| statement_error(StatementErrorKind::Close, sql, e))?;
                    thread::sleep(self.policy.delay);
                }
                Err(e) => {
                    self.close_quietly(stmt);
                    let kind = if e.is_lock_wait_timeout() {
                        StatementErrorKind::LockWaitExhausted
                    } else {
                        StatementErrorKind::Execute
                    };
                    return Err(statement_error(kind, sql, e));
                }
            }
        }
    }

    fn finish(
        &mut self,
        operation: Operation,
        sql: &str,
        mut stmt: D::Statement,
    ) -> Result<Execution> {
        let execution = match operation {
            Operation::Read => match self.driver.fetch_all(&mut stmt) {
                Ok(rows) => Execution::Rows(rows),
                Err(e) => {
                    self.close_quietly(stmt);
                    return Err(statement_error(StatementErrorKind::Execute, sql, e));
                }
            },
            Operation::Create => Execution::Inserted {
                insert_id: self.driver.last_insert_id(),
            },
            Operation::Write => Execution::Done {
                affected_rows: self.driver.affected_rows(),
            },
        };
        self.driver
            .close(stmt)
            .map_err(|e| statement_error(StatementErrorKind::Close, sql, e))?;
        Ok(execution)
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        self.driver.set_autocommit(enabled).map_err(|e| {
            let sql = if enabled {
                "SET autocommit=1"
            } else {
                "SET autocommit=0"
            };
            statement_error(StatementErrorKind::Autocommit, sql, e)
        })
    }

    fn close_quietly(&mut self, stmt: D::Statement) {
        if let Err(e) = self.driver.close(stmt) {
            tracing::debug!(error = %e, "closing failed statement");
        }
    }

    fn rollback(&mut self) {
        match self.driver.rollback() {
            Ok(()) => tracing::debug!("transaction rolled back"),
            Err(e) => tracing::warn!(error = %e, "rollback failed"),
        }
    }
}

fn statement_error(kind: StatementErrorKind, sql: &str, driver: DriverError) -> Error {
    Error::statement(kind, Some(sql), driver)
}
