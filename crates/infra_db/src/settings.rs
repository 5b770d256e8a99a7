//! Connection settings and pool tuning
//!
//! Settings are loaded once at startup (see `interface_api::config`) and
//! handed to [`Database::new`](crate::Database::new), which owns them for the
//! lifetime of the engine.

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::time::Duration;

use crate::error::DatabaseError;

/// Default connection scheme
pub const DEFAULT_DRIVER: &str = "postgresql://";

/// Application name reported to PostgreSQL for every pooled connection
const APPLICATION_NAME: &str = "diecastor";

/// Tuning options for the connection pool
///
/// # Example
///
/// ```rust
/// use infra_db::PoolConfig;
///
/// let pool = PoolConfig::default()
///     .pool_timeout(1)
///     .pool_size(2)
///     .max_overflow(0);
/// assert_eq!(pool.max_connections(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Seconds to wait for a pooled connection before giving up
    pub pool_timeout: u64,
    /// Maximum age of a pooled connection in seconds
    pub pool_recycle: u64,
    /// Check connection liveness before handing it out
    pub pool_pre_ping: bool,
    /// Connections the pool is sized for
    pub pool_size: u32,
    /// Connections allowed on top of `pool_size` under load
    pub max_overflow: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_timeout: 30,
            pool_recycle: 3600,
            pool_pre_ping: true,
            pool_size: 5,
            max_overflow: 10,
        }
    }
}

impl PoolConfig {
    /// Sets the acquisition timeout in seconds (default: 30)
    pub fn pool_timeout(mut self, seconds: u64) -> Self {
        self.pool_timeout = seconds;
        self
    }

    /// Sets the recycle interval in seconds (default: 3600)
    pub fn pool_recycle(mut self, seconds: u64) -> Self {
        self.pool_recycle = seconds;
        self
    }

    /// Enables or disables pre-ping (default: enabled)
    pub fn pool_pre_ping(mut self, enabled: bool) -> Self {
        self.pool_pre_ping = enabled;
        self
    }

    /// Sets the base pool size (default: 5)
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Sets the overflow allowance (default: 10)
    pub fn max_overflow(mut self, overflow: u32) -> Self {
        self.max_overflow = overflow;
        self
    }

    /// Upper bound of physical connections held by the pool
    pub fn max_connections(&self) -> u32 {
        self.pool_size.saturating_add(self.max_overflow)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.pool_recycle)
    }

    fn validate(&self) -> Result<(), DatabaseError> {
        if self.max_connections() == 0 {
            return Err(DatabaseError::EngineCreation(
                "pool_size + max_overflow must be at least 1".to_string(),
            ));
        }
        if self.pool_timeout == 0 {
            return Err(DatabaseError::EngineCreation(
                "pool_timeout must be at least 1 second".to_string(),
            ));
        }
        if self.pool_recycle == 0 {
            return Err(DatabaseError::EngineCreation(
                "pool_recycle must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection parameters for the catalogue database
#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Connection scheme, e.g. `postgresql://` or `postgresql+asyncpg://`
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

impl DatabaseSettings {
    /// Creates settings with the default driver and pool tuning
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            driver: default_driver(),
            pool: PoolConfig::default(),
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Checks everything the engine needs before it is built
    pub fn validate(&self) -> Result<(), DatabaseError> {
        validate_driver(&self.driver)?;
        if self.host.trim().is_empty() {
            return Err(DatabaseError::EngineCreation("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(DatabaseError::EngineCreation("port must not be 0".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(DatabaseError::EngineCreation(
                "database must not be empty".to_string(),
            ));
        }
        self.pool.validate()
    }

    /// Options used by the pool to open one raw connection
    ///
    /// Credentials travel here and never through the driver string.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .application_name(APPLICATION_NAME)
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("database", &self.database)
            .field("driver", &self.driver)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Accepts a bare PostgreSQL scheme, optionally with a `+dialect` suffix
///
/// Anything after `://` is rejected so that hosts and credentials can only
/// come from the explicit settings fields.
pub fn validate_driver(driver: &str) -> Result<(), DatabaseError> {
    let invalid = || DatabaseError::EngineCreation(format!("unsupported driver '{}'", driver));

    let (scheme, rest) = driver.split_once("://").ok_or_else(invalid)?;
    if !rest.is_empty() {
        return Err(DatabaseError::EngineCreation(
            "driver must be a bare scheme without host or credentials".to_string(),
        ));
    }

    let backend = scheme.split_once('+').map_or(scheme, |(backend, _)| backend);
    match backend {
        "postgres" | "postgresql" => Ok(()),
        _ => Err(invalid()),
    }
}
