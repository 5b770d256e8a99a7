//! Database error types
//!
//! This module defines the single error kind of the data layer. Engine
//! construction failures, use of a manager that is not (or no longer)
//! initialized, pool exhaustion and failures raised while a session runs all
//! surface as a [`DatabaseError`].

use thiserror::Error;

/// Errors that can occur in the database access layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The pooled engine could not be built from the settings
    #[error("Failed to create database engine: {0}")]
    EngineCreation(String),

    /// A session was requested from a manager that is not usable
    #[error("Database is not initialized")]
    NotInitialized,

    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// No connection became available within the pool timeout
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Commit or rollback of the session transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Value rejected by the column type, e.g. an unknown enum label
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl DatabaseError {
    /// Creates a not found error for a specific table and identifier
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("brands", "4f1c");
    /// assert!(error.to_string().contains("brands"));
    /// ```
    pub fn not_found(table: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", table, id))
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

/// Maps SQLx errors to the matching DatabaseError variant
///
/// Database errors are classified by their PostgreSQL SQLSTATE code.
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed => DatabaseError::NotInitialized,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::Configuration(_) => DatabaseError::EngineCreation(error.to_string()),
            sqlx::Error::Database(db_err) => {
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") | Some("23502") => DatabaseError::ConstraintViolation(message),
                    Some("22P02") => DatabaseError::InvalidValue(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::from(&error)
    }
}
