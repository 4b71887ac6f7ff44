//! MySQL driver for MySQLModel Rust.
//!
//! A synchronous implementation of the MySQL client/server protocol over
//! `std::net::TcpStream`. It provides:
//!
//! - Packet framing with sequence numbers
//! - Authentication (mysql_native_password, caching_sha2_password)
//! - Server-side prepared statements with binary result sets
//! - Text statements for session control
//! - Conversion between MySQL column types and [`Value`](mysqlmodel_core::Value)
//!
//! The connection implements [`Driver`](mysqlmodel_core::Driver), and
//! [`MySqlConnector`] implements [`Connector`](mysqlmodel_core::Connector)
//! for the connection factory.
//!
//! # Example
//!
//! ```rust,ignore
//! use mysqlmodel_mysql::{MySqlConfig, MySqlConnection};
//!
//! let config = MySqlConfig::new()
//!     .host("localhost")
//!     .port(3306)
//!     .user("root")
//!     .database("mydb");
//!
//! let conn = MySqlConnection::connect(config)?;
//! ```

pub mod auth;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod types;

pub use config::MySqlConfig;
pub use connection::{
    ConnectionState, MySqlConnection, MySqlConnector, MySqlStatement, ServerHandshake,
};
