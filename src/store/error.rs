//! Store error types

use thiserror::Error;

/// PostgreSQL SQLSTATE codes the store classifies
pub mod sqlstate {
    pub const SERIALIZATION_FAILURE: &str = "40001";
    pub const DEADLOCK_DETECTED: &str = "40P01";
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Isolation conflict reported by the database; safe to retry the whole transaction
    #[error("Serialization conflict: {0}")]
    Conflict(String),

    #[error("Row not found")]
    NotFound,

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(sqlstate::SERIALIZATION_FAILURE) | Some(sqlstate::DEADLOCK_DETECTED) => {
                    StoreError::Conflict(db_err.message().to_string())
                }
                Some(sqlstate::UNIQUE_VIOLATION) => {
                    StoreError::UniqueViolation(db_err.message().to_string())
                }
                Some(sqlstate::FOREIGN_KEY_VIOLATION) => {
                    StoreError::ForeignKeyViolation(db_err.message().to_string())
                }
                _ => StoreError::Database(e.to_string()),
            },
            _ => StoreError::Database(e.to_string()),
        }
    }
}
