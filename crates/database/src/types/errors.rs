//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Invalid {kind} value: {value}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("Malformed stored document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("Clinic id is required")]
    MissingClinicId,
}

impl DatabaseError {
    pub fn invalid_value(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            value: value.into(),
        }
    }

    /// True when the underlying failure is a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::QueryError(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
