//! Connection manager
//!
//! [`Database`] owns the single pooled engine for the process. The pool is
//! built lazily: physical connections are opened through the manager's
//! connection factory ([`DatabaseSettings::connect_options`]) the first time a
//! session needs one, and are released back to the pool when that session
//! closes.

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::DatabaseError;
use crate::settings::DatabaseSettings;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// Owner of the pooled engine
///
/// Constructed once at startup and shared by reference (typically behind an
/// `Arc` in the router state). Only [`Database::close`] disposes the engine.
///
/// # Example
///
/// ```rust,ignore
/// use infra_db::{Database, DatabaseSettings};
///
/// let database = Database::new(DatabaseSettings::new("localhost", 5432, "app", "pw", "diecastor"))?;
/// // ... serve requests ...
/// database.close().await;
/// ```
#[derive(Debug)]
pub struct Database {
    engine: DatabasePool,
    pub(crate) counters: Arc<SessionCounters>,
}

impl Database {
    /// Builds the pooled engine from the settings
    ///
    /// No connection is opened here. The pool spawns its recycling task on
    /// creation, so a Tokio runtime must be running.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::EngineCreation` if the settings are invalid or
    /// no Tokio runtime is available
    pub fn new(settings: DatabaseSettings) -> Result<Self, DatabaseError> {
        info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            "Establishing database connection..."
        );

        let engine = create_engine(&settings).map_err(|e| {
            error!(error = %e, "create_engine.error");
            e
        })?;

        Ok(Self {
            engine,
            counters: Arc::new(SessionCounters::default()),
        })
    }

    /// Disposes the engine and closes every pooled connection
    ///
    /// Waits for connections held by open sessions to be returned. Calling it
    /// again is a no-op.
    pub async fn close(&self) {
        if self.engine.is_closed() {
            warn!("close called on an already disposed engine");
            return;
        }

        self.engine.close().await;
        info!("Engine disposed and all connections closed.");
    }

    /// True while sessions may still be acquired
    pub fn is_open(&self) -> bool {
        !self.engine.is_closed()
    }

    /// Snapshot of the pool and session bookkeeping
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.engine.size(),
            idle: self.engine.num_idle(),
            max_connections: self.engine.options().get_max_connections(),
            closed: self.engine.is_closed(),
            sessions_opened: self.counters.opened.load(Ordering::SeqCst),
            sessions_closed: self.counters.closed.load(Ordering::SeqCst),
            commits: self.counters.committed.load(Ordering::SeqCst),
            rollbacks: self.counters.rolled_back.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn engine(&self) -> &DatabasePool {
        &self.engine
    }
}

/// Creates the lazily-connecting pool with the configured tuning
fn create_engine(settings: &DatabaseSettings) -> Result<DatabasePool, DatabaseError> {
    settings.validate()?;
    tokio::runtime::Handle::try_current()
        .map_err(|e| DatabaseError::EngineCreation(format!("no async runtime: {e}")))?;

    let pool = &settings.pool;
    info!(
        max_connections = pool.max_connections(),
        pool_timeout = pool.pool_timeout,
        pool_recycle = pool.pool_recycle,
        pool_pre_ping = pool.pool_pre_ping,
        "Creating database pool"
    );

    Ok(PgPoolOptions::new()
        .max_connections(pool.max_connections())
        .min_connections(0)
        .acquire_timeout(pool.acquire_timeout())
        .max_lifetime(pool.max_lifetime())
        .test_before_acquire(pool.pool_pre_ping)
        .connect_lazy_with(settings.connect_options()))
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Physical connections currently held by the pool
    pub size: u32,
    /// Connections sitting idle in the pool
    pub idle: usize,
    pub max_connections: u32,
    pub closed: bool,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    /// Transactions committed on the server
    pub commits: u64,
    /// Transactions rolled back on the server
    pub rollbacks: u64,
}

impl PoolStatus {
    /// Sessions acquired but not closed yet
    pub fn active_sessions(&self) -> u64 {
        self.sessions_opened.saturating_sub(self.sessions_closed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub(crate) opened: AtomicU64,
    pub(crate) closed: AtomicU64,
    pub(crate) committed: AtomicU64,
    pub(crate) rolled_back: AtomicU64,
}
