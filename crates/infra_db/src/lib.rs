//! Infrastructure Database Layer
//!
//! This crate provides the database access layer of the diecast catalogue:
//! one pooled PostgreSQL engine per process and scoped transactional sessions
//! handed out from it.
//!
//! # Architecture
//!
//! Settings → [`Database`] (connection manager) → [`Session`] (scoped unit of
//! work) → caller. The manager is built once at startup, passed explicitly to
//! whoever needs sessions, and disposed once at shutdown.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{Database, DatabaseSettings};
//!
//! let database = Database::new(settings)?;
//! let brands = database
//!     .session(false, |session| {
//!         Box::pin(async move {
//!             let rows = sqlx::query_as::<_, Brand>("SELECT * FROM brands")
//!                 .fetch_all(session.connection().await?)
//!                 .await?;
//!             Ok::<_, DatabaseError>(rows)
//!         })
//!     })
//!     .await?;
//! database.close().await;
//! ```

pub mod error;
pub mod pool;
pub mod schema;
pub mod session;
pub mod settings;

pub use error::DatabaseError;
pub use pool::{Database, DatabasePool, PoolStatus};
pub use session::{Session, SessionState};
pub use settings::{DatabaseSettings, PoolConfig};
