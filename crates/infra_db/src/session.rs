//! Scoped transactional sessions
//!
//! A [`Session`] is handed to a caller-supplied unit of work by
//! [`Database::session`] and is always closed before that call returns. The
//! work receives `&mut Session` only, so it cannot keep the session past the
//! scope or close it itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{Database, DatabaseError};
//!
//! database
//!     .session(true, |session| {
//!         Box::pin(async move {
//!             sqlx::query("INSERT INTO categories (id, is_limited) VALUES ($1, false)")
//!                 .bind(id)
//!                 .execute(session.connection().await?)
//!                 .await?;
//!             Ok::<_, DatabaseError>(())
//!         })
//!     })
//!     .await?;
//! ```

use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::{PgConnection, Postgres, Transaction};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::DatabaseError;
use crate::pool::{Database, DatabasePool, SessionCounters};

/// Lifecycle of a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handed out, no connection taken from the pool yet
    Created,
    /// A transaction is open on a pooled connection
    InUse,
    Committed,
    RolledBack,
    /// Terminal
    Closed,
}

/// Transaction-scoped handle into the pool
///
/// The underlying connection is checked out on the first call to
/// [`Session::connection`] and returned to the pool when the session closes.
pub struct Session {
    pool: DatabasePool,
    transaction: Option<Transaction<'static, Postgres>>,
    state: SessionState,
    counters: Arc<SessionCounters>,
    #[cfg(test)]
    faults: Faults,
}

/// Failures forced onto the next commit or rollback
#[cfg(test)]
#[derive(Debug, Default)]
struct Faults {
    commit: bool,
    rollback: bool,
}

#[cfg(test)]
impl Faults {
    fn take(flag: &mut bool, action: &str) -> Result<(), DatabaseError> {
        if std::mem::take(flag) {
            return Err(DatabaseError::TransactionFailed(format!("{action} failed")));
        }
        Ok(())
    }
}

impl Session {
    fn new(pool: DatabasePool, counters: Arc<SessionCounters>) -> Self {
        counters.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            pool,
            transaction: None,
            state: SessionState::Created,
            counters,
            #[cfg(test)]
            faults: Faults::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connection bound to the session's open transaction
    ///
    /// Begins a transaction on a pooled connection if none is open, waiting
    /// at most the configured pool timeout for one to become available.
    pub async fn connection(&mut self) -> Result<&mut PgConnection, DatabaseError> {
        if self.state == SessionState::Closed {
            return Err(DatabaseError::TransactionFailed("session is closed".to_string()));
        }

        let transaction = match self.transaction.take() {
            Some(transaction) => transaction,
            None => self.pool.begin().await?,
        };
        self.state = SessionState::InUse;

        Ok(&mut **self.transaction.insert(transaction))
    }

    /// Commits the open transaction, if any
    ///
    /// Only a transaction that reached the server is counted in
    /// [`PoolStatus::commits`](crate::PoolStatus::commits).
    pub async fn commit(&mut self) -> Result<(), DatabaseError> {
        #[cfg(test)]
        Faults::take(&mut self.faults.commit, "commit")?;

        if let Some(transaction) = self.transaction.take() {
            transaction
                .commit()
                .await
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
            self.counters.committed.fetch_add(1, Ordering::SeqCst);
        }
        self.state = SessionState::Committed;
        Ok(())
    }

    /// Rolls back the open transaction, if any
    pub async fn rollback(&mut self) -> Result<(), DatabaseError> {
        #[cfg(test)]
        Faults::take(&mut self.faults.rollback, "rollback")?;

        if let Some(transaction) = self.transaction.take() {
            transaction
                .rollback()
                .await
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
            self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
        }
        self.state = SessionState::RolledBack;
        Ok(())
    }

    #[cfg(test)]
    fn fail_next_commit(&mut self) {
        self.faults.commit = true;
    }

    #[cfg(test)]
    fn fail_next_rollback(&mut self) {
        self.faults.rollback = true;
    }

    async fn rollback_logged(&mut self) {
        if let Err(e) = self.rollback().await {
            error!(error = %e, "session.rollback_error");
        }
    }

    /// Releases the connection back to the pool
    ///
    /// A transaction still open at this point was never committed and is
    /// rolled back.
    async fn close(mut self) {
        if let Some(transaction) = self.transaction.take() {
            if let Err(e) = transaction.rollback().await {
                error!(error = %e, "session.close_error");
            }
        }
        self.mark_closed();
    }

    fn mark_closed(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        info!("Session closed.");
    }
}

impl Drop for Session {
    // Reached without `close` only when the scope future is dropped mid-work;
    // sqlx rolls the transaction back when the connection returns to the pool.
    fn drop(&mut self) {
        self.mark_closed();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

impl Database {
    /// Runs `work` with a fresh session and closes it afterwards
    ///
    /// With `commit` set, the session commits once `work` returns `Ok`.
    /// Without it, committing is left to `work` via [`Session::commit`].
    /// If `work` fails, the error is logged, the transaction is rolled back
    /// and the error is returned. A commit failure is rolled back too and
    /// surfaces as `DatabaseError::TransactionFailed`. A panic in `work`
    /// rolls back, closes the session and resumes unwinding.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotInitialized` (converted into `E`) without
    /// creating a session if the engine has been disposed.
    pub async fn session<T, E, F>(&self, commit: bool, work: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
        E: From<DatabaseError> + fmt::Display,
    {
        if !self.is_open() {
            error!("database_not_initialized");
            return Err(E::from(DatabaseError::NotInitialized));
        }

        info!(commit, "providing session from a connection pool...");
        let mut session = Session::new(self.engine().clone(), Arc::clone(&self.counters));

        let outcome = AssertUnwindSafe(work(&mut session)).catch_unwind().await;

        let result = match outcome {
            Ok(Ok(value)) if commit => match session.commit().await {
                Ok(()) => Ok(value),
                Err(e) => {
                    error!(error = %e, "session.error");
                    session.rollback_logged().await;
                    Err(E::from(e))
                }
            },
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(error = %e, "session.error");
                session.rollback_logged().await;
                Err(e)
            }
            Err(payload) => {
                error!("session.error: unit of work panicked");
                session.rollback_logged().await;
                session.close().await;
                panic::resume_unwind(payload);
            }
        };

        session.close().await;
        result
    }
}
