//! Custom error types for the common library
//!
//! This module defines the database error type shared by the TaskMate
//! services. Service-level HTTP errors wrap it rather than exposing
//! driver errors directly.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_keep_context() {
        let err = DatabaseError::Migration("relation already exists".to_string());
        assert_eq!(
            err.to_string(),
            "Database migration error: relation already exists"
        );

        let err = DatabaseError::Configuration("missing DATABASE_URL".to_string());
        assert!(err.to_string().contains("missing DATABASE_URL"));
    }
}
