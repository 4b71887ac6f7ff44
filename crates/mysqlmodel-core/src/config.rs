//! Connection parameters and environment configuration.
//!
//! The environment lists logical database names in `MYSQLMODEL_DATABASES`
//! (comma-separated). Each name `foo` then needs `MYSQLMODEL_DB_FOO` holding
//! `host,username,password,dbName,port`. The string is split on every comma;
//! there is no escaping, so none of the parts may contain one.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Variable listing the logical database names.
pub const DATABASES_VAR: &str = "MYSQLMODEL_DATABASES";

/// Prefix of the per-database connection string variables.
pub const DATABASE_VAR_PREFIX: &str = "MYSQLMODEL_DB_";

/// Physical connection target for one logical database.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub username: String,
    pub password: String,
    pub db_name: String,
    pub port: u16,
}

impl ConnectionParams {
    /// Parse `host,username,password,dbName,port`.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').collect();
        let [host, username, password, db_name, port] = parts.as_slice() else {
            return Err(Error::invalid_config(format!(
                "connection string must have 5 comma-separated parts, found {}",
                parts.len()
            )));
        };
        let port = port.trim().parse::<u16>().map_err(|e| {
            Error::invalid_config(format!("invalid port '{}' in connection string: {e}", port))
        })?;
        if host.trim().is_empty() {
            return Err(Error::invalid_config("connection string has an empty host"));
        }

        Ok(Self {
            host: host.trim().to_string(),
            username: (*username).to_string(),
            password: (*password).to_string(),
            db_name: db_name.trim().to_string(),
            port,
        })
    }

    /// `host:port`, for log fields.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("db_name", &self.db_name)
            .field("port", &self.port)
            .finish()
    }
}

/// Connection parameters per logical database name.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    databases: BTreeMap<String, ConnectionParams>,
}

impl DatabaseConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        let Some(names) = lookup(DATABASES_VAR) else {
            tracing::debug!(var = DATABASES_VAR, "no logical databases configured");
            return Ok(config);
        };

        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let var = format!("{DATABASE_VAR_PREFIX}{}", name.to_uppercase());
            let raw = lookup(&var).ok_or_else(|| Error::missing_connection(name))?;
            let params = ConnectionParams::parse(&raw)?;
            tracing::debug!(database = name, address = %params.address(), "configured database");
            config.insert(name, params);
        }
        Ok(config)
    }

    /// Register (or replace) the parameters for a logical name.
    pub fn insert(&mut self, name: impl Into<String>, params: ConnectionParams) {
        self.databases.insert(name.into(), params);
    }

    /// Parameters for a logical name.
    pub fn get(&self, name: &str) -> Option<&ConnectionParams> {
        self.databases.get(name)
    }

    /// Parameters for a logical name, or a missing-connection error.
    pub fn require(&self, name: &str) -> Result<&ConnectionParams> {
        self.get(name).ok_or_else(|| Error::missing_connection(name))
    }

    /// Configured logical names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}
