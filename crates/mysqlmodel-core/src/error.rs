//! Error types for MySQLModel operations.

use std::fmt;

/// MySQL error code for `ER_LOCK_WAIT_TIMEOUT` ("Lock wait timeout exceeded").
pub const LOCK_WAIT_TIMEOUT: u16 = 1205;

/// The primary error type for all MySQLModel operations.
#[derive(Debug)]
pub enum Error {
    /// Missing or malformed configuration (e.g. unknown logical database name)
    Config(ConfigError),
    /// Connection-related errors (connect, authentication, lost connection)
    Connection(ConnectionError),
    /// Statement lifecycle errors (prepare, execute, close, autocommit)
    Statement(StatementError),
    /// Zero or several rows where exactly one was expected
    Record(RecordError),
    /// Operation not available for the table's shape
    Unsupported(String),
    /// Protocol errors (wire-level)
    Protocol(ProtocolError),
    /// Type conversion errors
    Type(TypeError),
    /// I/O errors
    Io(std::io::Error),
}

#[derive(Debug)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// No connection string registered for a logical database name
    MissingConnection,
    /// A connection string or table definition could not be parsed
    Invalid,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Authentication failed
    Authentication,
    /// Connection lost during operation
    Disconnected,
    /// Connection refused
    Refused,
}

/// Failure reported by a [`Driver`](crate::Driver) call.
///
/// `code` is the MySQL server error number (0 when the failure did not come
/// from an error packet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub code: u16,
    pub sqlstate: Option<String>,
    pub message: String,
}

impl DriverError {
    /// Create a driver error with the given server code.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            sqlstate: None,
            message: message.into(),
        }
    }

    /// Attach a SQLSTATE.
    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }

    /// Is this the server's "lock wait timeout exceeded" condition?
    pub fn is_lock_wait_timeout(&self) -> bool {
        self.code == LOCK_WAIT_TIMEOUT
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sqlstate {
            Some(state) => write!(f, "{} ({}, SQLSTATE {})", self.message, self.code, state),
            None if self.code != 0 => write!(f, "{} ({})", self.message, self.code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for DriverError {}

#[derive(Debug)]
pub struct StatementError {
    pub kind: StatementErrorKind,
    /// The statement text that failed, if one was involved
    pub sql: Option<String>,
    pub driver: DriverError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementErrorKind {
    /// The server rejected the statement at prepare time
    Prepare,
    /// Execution (or fetching) failed with a non-retryable driver error
    Execute,
    /// Execution kept hitting the lock wait timeout until retries ran out
    LockWaitExhausted,
    /// Closing the prepared statement failed
    Close,
    /// Toggling autocommit failed
    Autocommit,
}

#[derive(Debug)]
pub struct RecordError {
    pub kind: RecordErrorKind,
    pub table: String,
    pub sql: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordErrorKind {
    /// Zero rows where exactly one was expected
    NotFound,
    /// More than one row where exactly one was expected
    MultipleFound(usize),
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    pub raw_data: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl Error {
    /// Build a missing-connection configuration error.
    pub fn missing_connection(name: &str) -> Self {
        Error::Config(ConfigError {
            kind: ConfigErrorKind::MissingConnection,
            message: format!("no connection string registered for database '{name}'"),
        })
    }

    /// Build an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            kind: ConfigErrorKind::Invalid,
            message: message.into(),
        })
    }

    /// Build a statement error.
    pub fn statement(kind: StatementErrorKind, sql: Option<&str>, driver: DriverError) -> Self {
        Error::Statement(StatementError {
            kind,
            sql: sql.map(str::to_string),
            driver,
        })
    }

    /// Build an unsupported-operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported(message.into())
    }

    /// Did execution give up after repeated lock wait timeouts?
    pub fn is_lock_wait_exhausted(&self) -> bool {
        matches!(
            self,
            Error::Statement(StatementError {
                kind: StatementErrorKind::LockWaitExhausted,
                ..
            })
        )
    }

    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(c) => matches!(
                c.kind,
                ConnectionErrorKind::Connect
                    | ConnectionErrorKind::Disconnected
                    | ConnectionErrorKind::Refused
            ),
            Error::Protocol(_) | Error::Io(_) => true,
            _ => false,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Statement(s) => s.sql.as_deref(),
            Error::Record(r) => Some(&r.sql),
            _ => None,
        }
    }

    /// Get the driver-reported error, if any
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Error::Statement(s) => Some(&s.driver),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Statement(e) => write!(f, "Statement error: {e}"),
            Error::Record(e) => write!(f, "Record error: {e}"),
            Error::Unsupported(msg) => write!(f, "Unsupported operation: {msg}"),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Type(e) => write!(f, "Type error: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Statement(e) => Some(&e.driver),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for StatementErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatementErrorKind::Prepare => "prepare failed",
            StatementErrorKind::Execute => "execute failed",
            StatementErrorKind::LockWaitExhausted => "lock wait timeout, retries exhausted",
            StatementErrorKind::Close => "close failed",
            StatementErrorKind::Autocommit => "autocommit toggle failed",
        };
        f.write_str(label)
    }
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) => write!(f, "{}: {} [{}]", self.kind, self.driver, sql),
            None => write!(f, "{}: {}", self.kind, self.driver),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RecordErrorKind::NotFound => {
                write!(f, "no record found in '{}' [{}]", self.table, self.sql)
            }
            RecordErrorKind::MultipleFound(n) => write!(
                f,
                "expected one record in '{}', found {} [{}]",
                self.table, n, self.sql
            ),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<StatementError> for Error {
    fn from(err: StatementError) -> Self {
        Error::Statement(err)
    }
}

impl From<RecordError> for Error {
    fn from(err: RecordError) -> Self {
        Error::Record(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

/// Result type alias for MySQLModel operations.
pub type Result<T> = std::result::Result<T, Error>;
