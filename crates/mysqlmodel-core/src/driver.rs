//! The driver seam.
//!
//! - [`Driver`] - a live connection able to run server-side prepared statements
//! - [`Connector`] - opens a [`Driver`] for a set of [`ConnectionParams`]
//!
//! Everything above this seam (execution engine, factory, table façade) is
//! written against these traits, so it runs equally against the wire-protocol
//! driver and against scripted test doubles.

use crate::config::ConnectionParams;
use crate::error::{DriverError, Result};
use crate::field::BindType;
use crate::row::Row;
use crate::value::Value;

/// Result of a single driver call.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// A live, synchronous database connection.
///
/// Calls take `&mut self`: a handle serves one unit of work at a time.
pub trait Driver {
    /// Driver-specific prepared statement handle.
    type Statement;

    /// Turn autocommit on or off for the session.
    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()>;

    /// Prepare a statement on the server.
    fn prepare(&mut self, sql: &str) -> DriverResult<Self::Statement>;

    /// Execute a prepared statement with positional parameters.
    ///
    /// `types` carries one bind type per value.
    fn execute(
        &mut self,
        stmt: &mut Self::Statement,
        types: &[BindType],
        values: &[Value],
    ) -> DriverResult<()>;

    /// Fetch every row produced by the last execution of `stmt`.
    fn fetch_all(&mut self, stmt: &mut Self::Statement) -> DriverResult<Vec<Row>>;

    /// Release a prepared statement.
    fn close(&mut self, stmt: Self::Statement) -> DriverResult<()>;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> DriverResult<()>;

    /// Check that the connection is alive.
    fn ping(&mut self) -> DriverResult<()>;

    /// Auto-increment value generated by the last execution (0 if none).
    fn last_insert_id(&self) -> u64;

    /// Rows affected by the last execution.
    fn affected_rows(&self) -> u64;

    /// Close the connection.
    fn disconnect(&mut self) -> DriverResult<()>;
}

/// Opens driver connections.
pub trait Connector {
    type Driver: Driver;

    /// Connect to the database described by `params`.
    fn connect(&self, params: &ConnectionParams) -> Result<Self::Driver>;
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    type Statement = D::Statement;

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        (**self).set_autocommit(enabled)
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<Self::Statement> {
        (**self).prepare(sql)
    }

    fn execute(
        &mut self,
        stmt: &mut Self::Statement,
        types: &[BindType],
        values: &[Value],
    ) -> DriverResult<()> {
        (**self).execute(stmt, types, values)
    }

    fn fetch_all(&mut self, stmt: &mut Self::Statement) -> DriverResult<Vec<Row>> {
        (**self).fetch_all(stmt)
    }

    fn close(&mut self, stmt: Self::Statement) -> DriverResult<()> {
        (**self).close(stmt)
    }

    fn rollback(&mut self) -> DriverResult<()> {
        (**self).rollback()
    }

    fn ping(&mut self) -> DriverResult<()> {
        (**self).ping()
    }

    fn last_insert_id(&self) -> u64 {
        (**self).last_insert_id()
    }

    fn affected_rows(&self) -> u64 {
        (**self).affected_rows()
    }

    fn disconnect(&mut self) -> DriverResult<()> {
        (**self).disconnect()
    }
}
