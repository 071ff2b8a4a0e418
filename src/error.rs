//! Error types for the agent router
//!
//! Routing and state tracking are total and never produce these errors.
//! They only surface from the persistence and configuration layers.

use thiserror::Error;

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {

    // =============================
    // Session State Errors
    // =============================

    #[error("Session state error: {0}")]
    StateError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_row() -> Result<()> {
        Err(sqlx::Error::RowNotFound)?
    }

    #[test]
    fn test_library_errors_convert() {
        let error = query_row().unwrap_err();
        assert!(matches!(error, RouterError::SqlError(sqlx::Error::RowNotFound)));
        assert!(error.to_string().starts_with("SQL error:"));

        let error: RouterError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(error, RouterError::SerializationError(_)));
    }
}
