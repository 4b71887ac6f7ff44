//! Connection factory.
//!
//! Holds at most one open driver per logical database name. Handles are
//! opened lazily from the registered [`ConnectionParams`], validated with a
//! ping before each unit of work and closed together by [`reset`].
//!
//! [`reset`]: ConnectionFactory::reset

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use mysqlmodel_core::{ConnectionParams, Connector, DatabaseConfig, Driver, Result};

/// Cache of driver handles keyed by logical database name.
pub struct ConnectionFactory<C: Connector> {
    connector: C,
    config: DatabaseConfig,
    cache: HashMap<String, C::Driver>,
}

impl<C: Connector> ConnectionFactory<C> {
    pub fn new(connector: C, config: DatabaseConfig) -> Self {
        Self {
            connector,
            config,
            cache: HashMap::new(),
        }
    }

    /// Register (or replace) the parameters for a logical database.
    ///
    /// An open handle for `name` keeps running against the old target until
    /// the next [`reset`](Self::reset).
    pub fn register(&mut self, name: impl Into<String>, params: ConnectionParams) {
        self.config.insert(name, params);
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Is a handle for `name` currently cached?
    pub fn is_connected(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Number of cached handles.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Cached handle for `name`, connecting first if there is none.
    pub fn connection(&mut self, name: &str) -> Result<&mut C::Driver> {
        match self.cache.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let params = self.config.require(name)?;
                let driver = self.connector.connect(params)?;
                tracing::debug!(database = name, address = %params.address(), "cached new connection");
                Ok(entry.insert(driver))
            }
        }
    }

    /// Like [`connection`](Self::connection), but a cached handle that no
    /// longer answers a ping is replaced by a fresh one.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn keepalive(&mut self, name: &str) -> Result<&mut C::Driver> {
        let stale = match self.cache.get_mut(name) {
            Some(driver) => match driver.ping() {
                Ok(()) => false,
                Err(e) => {
                    tracing::warn!(database = name, error = %e, "ping failed, reconnecting");
                    true
                }
            },
            None => false,
        };
        if stale {
            if let Some(mut old) = self.cache.remove(name) {
                if let Err(e) = old.disconnect() {
                    tracing::debug!(database = name, error = %e, "closing stale connection");
                }
            }
        }
        self.connection(name)
    }

    /// Ping and close every cached handle, then empty the cache.
    ///
    /// Meant to be called at the end of each unit of work.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn reset(&mut self) {
        let count = self.cache.len();
        for (name, mut driver) in self.cache.drain() {
            if let Err(e) = driver.ping() {
                tracing::debug!(database = %name, error = %e, "ping before close failed");
            }
            if let Err(e) = driver.disconnect() {
                tracing::warn!(database = %name, error = %e, "failed to close connection");
            }
        }
        if count > 0 {
            tracing::info!(closed = count, "connection cache reset");
        }
    }
}

impl<C: Connector> fmt::Debug for ConnectionFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cached: Vec<&str> = self.cache.keys().map(String::as_str).collect();
        cached.sort_unstable();
        f.debug_struct("ConnectionFactory")
            .field("databases", &self.config.names().collect::<Vec<_>>())
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}
