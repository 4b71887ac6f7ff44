//! Process-wide connection factory.
//!
//! The factory is built from the environment on first use and lives for the
//! rest of the process. A mutex serializes every use of it, so connect,
//! replace and reset never race for the same logical database.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use mysqlmodel_core::{DatabaseConfig, Result};
use mysqlmodel_mysql::{MySqlConnection, MySqlConnector};

use crate::factory::ConnectionFactory;

/// The factory type shared by the process.
pub type SharedFactory = ConnectionFactory<MySqlConnector>;

static SHARED: OnceLock<Mutex<SharedFactory>> = OnceLock::new();

fn shared() -> Result<&'static Mutex<SharedFactory>> {
    if let Some(factory) = SHARED.get() {
        return Ok(factory);
    }
    let config = DatabaseConfig::from_env()?;
    tracing::debug!(databases = config.len(), "initialising shared connection factory");
    Ok(SHARED.get_or_init(|| Mutex::new(ConnectionFactory::new(MySqlConnector::new(), config))))
}

fn lock(factory: &'static Mutex<SharedFactory>) -> MutexGuard<'static, SharedFactory> {
    factory.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` with exclusive access to the shared factory.
pub fn with_shared_factory<T>(f: impl FnOnce(&mut SharedFactory) -> Result<T>) -> Result<T> {
    let mut factory = lock(shared()?);
    f(&mut factory)
}

/// Run `f` on the live shared connection for the logical database `name`.
pub fn with_shared_connection<T>(
    name: &str,
    f: impl FnOnce(&mut MySqlConnection) -> Result<T>,
) -> Result<T> {
    with_shared_factory(|factory| f(factory.keepalive(name)?))
}

/// Close every shared connection. Does nothing before first use.
pub fn reset_shared() {
    if let Some(factory) = SHARED.get() {
        lock(factory).reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_database_is_reported_and_reset_is_safe() {
        reset_shared();
        let err = with_shared_connection("mysqlmodel_unconfigured", |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("mysqlmodel_unconfigured"));
        reset_shared();
        let cached = with_shared_factory(|factory| Ok(factory.cached())).unwrap();
        assert_eq!(cached, 0);
    }
}
