mod common;

use std::time::{Duration, Instant};

use mysqlmodel::{Executor, Field, Operation, Record, RetryPolicy, Table, Value};
use mysqlmodel_core::{Error, PendingWrite, StatementErrorKind, WriteKind};
use mysqlmodel_query::StatementGenerator;

use common::{driver, script};

fn users() -> Table {
    Table::builder("users", "main")
        .field(Field::integer("id").auto_increment())
        .field(Field::string("name"))
        .build()
        .unwrap()
}

fn statement_kind(err: &Error) -> Option<StatementErrorKind> {
    match err {
        Error::Statement(s) => Some(s.kind),
        _ => None,
    }
}

#[test]
fn three_lock_waits_then_success_sleeps_without_rollback() {
    let script = script();
    script.borrow_mut().execute_failures.extend([1205, 1205, 1205]);
    let mut driver = driver(&script);

    let table = users();
    let stmt = StatementGenerator::new(&table).delete().unwrap();
    let started = Instant::now();
    let execution = Executor::new(&mut driver)
        .execute(Operation::Write, &stmt, &[Value::Int(1)])
        .unwrap();
    let elapsed = started.elapsed();

    assert!(matches!(execution, mysqlmodel::Execution::Done { .. }));
    assert!(elapsed >= Duration::from_millis(300), "slept {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "slept {elapsed:?}");

    let script = script.borrow();
    assert_eq!(script.count("execute"), 4);
    assert_eq!(script.count("prepare"), 4);
    assert_eq!(script.count("rollback"), 0);
    assert_eq!(script.calls.last().map(String::as_str), Some("autocommit=1"));
}

#[test]
fn eleven_lock_waits_exhaust_retries_with_one_rollback() {
    let script = script();
    script.borrow_mut().execute_failures.extend([1205; 11]);
    let mut driver = driver(&script);

    let table = users();
    let stmt = StatementGenerator::new(&table).update().unwrap();
    let err = Executor::with_policy(&mut driver, RetryPolicy::new(10, Duration::from_millis(1)))
        .execute(Operation::Write, &stmt, &[Value::from("ann"), Value::Int(1)])
        .unwrap_err();

    assert!(err.is_lock_wait_exhausted());
    assert_eq!(err.sql(), Some("UPDATE users SET name=? WHERE id=?;"));
    assert_eq!(err.driver_error().map(|d| d.code), Some(1205));

    let script = script.borrow();
    assert_eq!(script.count("execute"), 11);
    assert_eq!(script.count("rollback"), 1);
    assert_eq!(script.count("close"), 11);
}

#[test]
fn other_execute_failures_roll_back_immediately() {
    let script = script();
    script.borrow_mut().execute_failures.push_back(1062);
    let mut driver = driver(&script);

    let table = users();
    let stmt = StatementGenerator::new(&table).insert();
    let err = Executor::new(&mut driver)
        .execute(Operation::Create, &stmt, &[Value::Null, Value::from("ann")])
        .unwrap_err();

    assert_eq!(statement_kind(&err), Some(StatementErrorKind::Execute));
    let script = script.borrow();
    assert_eq!(script.count("execute"), 1);
    assert_eq!(script.count("rollback"), 1);
    assert_eq!(script.count("autocommit=1"), 0);
}

#[test]
fn create_returns_generated_id() {
    let script = script();
    let mut driver = driver(&script);

    let table = users();
    let stmt = StatementGenerator::new(&table).insert();
    let execution = Executor::new(&mut driver)
        .execute(Operation::Create, &stmt, &[Value::Null, Value::from("ann")])
        .unwrap();

    assert_eq!(execution.insert_id(), Some(100));
    assert_eq!(
        script.borrow().executed,
        [vec![Value::Null, Value::Text("ann".into())]]
    );
}

#[test]
fn read_returns_fetched_rows() {
    let script = script();
    script
        .borrow_mut()
        .results
        .push_back(vec![common::counter_row(2)]);
    let mut driver = driver(&script);

    let table = users();
    let rows = Executor::new(&mut driver)
        .execute(Operation::Read, &StatementGenerator::new(&table).count(), &[])
        .unwrap()
        .into_rows();

    assert_eq!(rows.len(), 1);
    assert_eq!(
        script.borrow().calls,
        [
            "autocommit=0",
            "prepare SELECT count(*) AS counter FROM users;",
            "execute",
            "fetch",
            "close",
            "autocommit=1",
        ]
    );
}

#[test]
fn failing_batch_rolls_back_once_and_unstages_records() {
    let script = script();
    script.borrow_mut().fail_sql = Some("DELETE".to_string());
    let mut driver = driver(&script);

    let table = users();
    let generator = StatementGenerator::new(&table);
    let mut first = Record::new().with("name", "ann");
    first.stage(generator.insert().stage(WriteKind::Insert, first.values()));
    let mut second = Record::new().with("id", 7).with("name", "bob");
    second.stamp_snapshot();
    second.mark_deleted();
    second.stage(generator.delete().unwrap().stage(WriteKind::Delete, second.values()));

    let mut records = vec![first, second];
    let err = Executor::new(&mut driver)
        .run_batch(&table, &mut records)
        .unwrap_err();

    assert_eq!(statement_kind(&err), Some(StatementErrorKind::Execute));
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.pending().is_none()));
    assert!(records[1].is_deleted());
    assert!(records[0].get("id").is_none());

    let script = script.borrow();
    assert_eq!(script.count("autocommit=0"), 1);
    assert_eq!(script.count("rollback"), 1);
    assert_eq!(script.count("execute"), 2);
}

#[test]
fn batch_uses_staged_values_and_types() {
    let script = script();
    let mut driver = driver(&script);

    let table = users();
    let mut record = Record::new().with("id", 3).with("name", "cy");
    record.stamp_snapshot();
    record.set("name", "cyd");
    record.stage(PendingWrite {
        kind: WriteKind::Update,
        sql: "UPDATE users SET name=? WHERE id=?;".into(),
        types: "si".into(),
        values: vec![Value::from("cyd"), Value::Int(3)],
    });

    let mut records = vec![record];
    let executed = Executor::new(&mut driver)
        .run_batch(&table, &mut records)
        .unwrap();

    assert_eq!(executed, 1);
    assert_eq!(records[0].status(), mysqlmodel::RecordStatus::Unchanged);
    assert_eq!(
        script.borrow().executed,
        [vec![Value::Text("cyd".into()), Value::Int(3)]]
    );
}
