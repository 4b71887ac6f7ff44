//! MySQLModel Rust: table-oriented data access over MySQL.
//!
//! This crate ties the workspace together:
//!
//! - [`Executor`] runs statements inside an autocommit bracket, retrying
//!   lock wait timeouts and rolling back on failure
//! - [`ConnectionFactory`] keeps one driver handle per logical database
//! - [`TableService`] offers record-level operations on a registered table
//! - [`shared`] holds a process-wide factory configured from the environment
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mysqlmodel::prelude::*;
//!
//! let users = Arc::new(
//!     Table::builder("users", "main")
//!         .field(Field::integer("id").auto_increment())
//!         .field(Field::string("name"))
//!         .field(Field::string("updated_at").update_timestamp())
//!         .build()?,
//! );
//!
//! let mut factory = ConnectionFactory::new(MySqlConnector::new(), DatabaseConfig::from_env()?);
//! let mut service = TableService::new(users, &mut factory);
//!
//! let mut ann = Record::new().with("name", "Ann");
//! service.insert(&mut ann)?;
//! let mut records = service.all()?;
//! records[0].set("name", "Annie");
//! service.update(&mut records)?;
//! factory.reset();
//! ```

pub mod engine;
pub mod factory;
pub mod shared;
pub mod table;

pub use engine::{Execution, Executor, Operation, RetryPolicy};
pub use factory::ConnectionFactory;
pub use shared::{reset_shared, with_shared_connection, with_shared_factory};
pub use table::TableService;

pub use mysqlmodel_core::{
    BindType, ConnectionParams, Connector, DatabaseConfig, Driver, DriverError, Error, Field,
    FieldType, Record, RecordStatus, Result, Row, Table, TableRegistry, UpsertMode, Value, Values,
};
pub use mysqlmodel_mysql::{MySqlConfig, MySqlConnection, MySqlConnector};
pub use mysqlmodel_query::{Statement, StatementGenerator, UpsertBuilder};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ConnectionFactory, ConnectionParams, DatabaseConfig, Error, Execution, Executor, Field,
        MySqlConnector, Operation, Record, Result, RetryPolicy, Table, TableRegistry,
        TableService, Value, Values,
    };
}
