//! SQL statement generation for MySQLModel Rust.
//!
//! `mysqlmodel-query` turns [`Table`](mysqlmodel_core::Table) metadata into
//! parameterized MySQL statements plus the bind specification that describes
//! their placeholders. It performs no I/O; statements run through the
//! execution engine in the `mysqlmodel` crate.
//!
//! ```
//! use mysqlmodel_core::{Field, Table};
//! use mysqlmodel_query::StatementGenerator;
//!
//! let users = Table::builder("users", "main")
//!     .field(Field::integer("id").auto_increment())
//!     .field(Field::string("name"))
//!     .build()
//!     .unwrap();
//!
//! let stmt = StatementGenerator::new(&users).select_by_id().unwrap();
//! assert_eq!(stmt.sql(), "SELECT * FROM users WHERE id=?;");
//! assert_eq!(stmt.params(), ["i", "id"]);
//! ```

pub mod builder;
pub mod join;
pub mod statement;
pub mod upsert;

pub use builder::{COUNT_ALIAS, StatementGenerator};
pub use join::first_level_join;
pub use statement::{BindSpec, Statement};
pub use upsert::{UpsertBuilder, UpsertStatement};
