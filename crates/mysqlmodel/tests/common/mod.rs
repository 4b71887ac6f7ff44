//! Scripted driver shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use mysqlmodel::{
    BindType, ConnectionParams, Connector, DatabaseConfig, Driver, DriverError, Error, Result,
    Row, Value,
};
use mysqlmodel_core::{ConnectionError, ConnectionErrorKind, DriverResult};

/// Everything the mock saw plus what it should do next.
#[derive(Debug, Default)]
pub struct Script {
    pub calls: Vec<String>,
    /// Bound values of every execute, in order
    pub executed: Vec<Vec<Value>>,
    /// Error codes returned by upcoming executes
    pub execute_failures: VecDeque<u16>,
    /// Fail the execute of statements containing this text
    pub fail_sql: Option<String>,
    /// Result sets handed out by upcoming executes
    pub results: VecDeque<Vec<Row>>,
    pub next_insert_id: u64,
    /// Upcoming pings that report a lost connection
    pub ping_failures: usize,
    pub refuse_connect: bool,
    pub connects: usize,
}

impl Script {
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn prepared(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| c.strip_prefix("prepare "))
            .collect()
    }
}

pub type Shared = Rc<RefCell<Script>>;

pub fn script() -> Shared {
    Rc::new(RefCell::new(Script {
        next_insert_id: 100,
        ..Script::default()
    }))
}

#[derive(Debug)]
pub struct MockStatement {
    sql: String,
    rows: Vec<Row>,
}

#[derive(Debug)]
pub struct MockDriver {
    script: Shared,
    last_insert_id: u64,
}

impl Driver for MockDriver {
    type Statement = MockStatement;

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        let call = format!("autocommit={}", u8::from(enabled));
        self.script.borrow_mut().calls.push(call);
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<MockStatement> {
        self.script.borrow_mut().calls.push(format!("prepare {sql}"));
        Ok(MockStatement {
            sql: sql.to_string(),
            rows: Vec::new(),
        })
    }

    fn execute(
        &mut self,
        stmt: &mut MockStatement,
        _types: &[BindType],
        values: &[Value],
    ) -> DriverResult<()> {
        let mut script = self.script.borrow_mut();
        script.calls.push("execute".to_string());
        script.executed.push(values.to_vec());
        if let Some(code) = script.execute_failures.pop_front() {
            return Err(DriverError::new(code, "scripted failure"));
        }
        if script
            .fail_sql
            .as_deref()
            .is_some_and(|needle| stmt.sql.contains(needle))
        {
            return Err(DriverError::new(1452, "foreign key constraint fails"));
        }
        self.last_insert_id = 0;
        if stmt.sql.starts_with("INSERT") {
            self.last_insert_id = script.next_insert_id;
            script.next_insert_id += 1;
        }
        if stmt.sql.starts_with("SELECT") {
            stmt.rows = script.results.pop_front().unwrap_or_default();
        }
        Ok(())
    }

    fn fetch_all(&mut self, stmt: &mut MockStatement) -> DriverResult<Vec<Row>> {
        self.script.borrow_mut().calls.push("fetch".to_string());
        Ok(std::mem::take(&mut stmt.rows))
    }

    fn close(&mut self, _stmt: MockStatement) -> DriverResult<()> {
        self.script.borrow_mut().calls.push("close".to_string());
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.script.borrow_mut().calls.push("rollback".to_string());
        Ok(())
    }

    fn ping(&mut self) -> DriverResult<()> {
        let mut script = self.script.borrow_mut();
        script.calls.push("ping".to_string());
        if script.ping_failures > 0 {
            script.ping_failures -= 1;
            return Err(DriverError::new(2013, "Lost connection to MySQL server"));
        }
        Ok(())
    }

    fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    fn affected_rows(&self) -> u64 {
        1
    }

    fn disconnect(&mut self) -> DriverResult<()> {
        self.script.borrow_mut().calls.push("disconnect".to_string());
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockConnector {
    pub script: Shared,
}

impl Connector for MockConnector {
    type Driver = MockDriver;

    fn connect(&self, params: &ConnectionParams) -> Result<MockDriver> {
        let mut script = self.script.borrow_mut();
        script.calls.push(format!("connect {}", params.db_name));
        if script.refuse_connect {
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Refused,
                message: format!("failed to connect to {}", params.address()),
                source: None,
            }));
        }
        script.connects += 1;
        Ok(MockDriver {
            script: Rc::clone(&self.script),
            last_insert_id: 0,
        })
    }
}

/// Driver that is not managed by a factory.
pub fn driver(script: &Shared) -> MockDriver {
    MockDriver {
        script: Rc::clone(script),
        last_insert_id: 0,
    }
}

/// Configuration with one logical database `main`.
pub fn config() -> DatabaseConfig {
    let mut config = DatabaseConfig::new();
    config.insert(
        "main",
        ConnectionParams::parse("localhost,app,secret,app_db,3306").expect("valid params"),
    );
    config
}

pub fn counter_row(n: i64) -> Row {
    Row::new(vec!["counter".to_string()], vec![Value::Int(n)])
}
