//! Core types and traits for MySQLModel Rust.
//!
//! This crate provides the foundations shared by the statement generator,
//! the MySQL driver and the execution layer:
//!
//! - `Value` and `Row` for dynamically typed results
//! - `Field`, `Table` and `TableRegistry` for static table metadata
//! - `Record` for snapshot-based dirty tracking
//! - `ConnectionParams` and `DatabaseConfig` for environment configuration
//! - `Driver` and `Connector`, the seam to the database

pub mod config;
pub mod driver;
pub mod error;
pub mod field;
pub mod record;
pub mod row;
pub mod table;
pub mod value;

pub use config::{ConnectionParams, DatabaseConfig};
pub use driver::{Connector, Driver, DriverResult};
pub use error::{
    ConfigError, ConfigErrorKind, ConnectionError, ConnectionErrorKind, DriverError, Error,
    LOCK_WAIT_TIMEOUT, ProtocolError, RecordError, RecordErrorKind, Result, StatementError,
    StatementErrorKind, TypeError,
};
pub use field::{BindType, Field, FieldType};
pub use record::{PendingWrite, Record, RecordStatus, Values, WriteKind};
pub use row::{ColumnInfo, Row};
pub use table::{Table, TableBuilder, TableRegistry, UpsertMode};
pub use value::Value;
