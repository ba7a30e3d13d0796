//! Database error types.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Record already exists
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// Input rejected before reaching the database
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
}

impl DatabaseError {
    /// Whether this error is a uniqueness violation.
    ///
    /// Covers both errors already mapped to [`DatabaseError::AlreadyExists`]
    /// and raw constraint failures coming straight from SQLx.
    pub fn is_duplicate(&self) -> bool {
        match self {
            DatabaseError::AlreadyExists { .. } => true,
            DatabaseError::Sqlx(e) => is_unique_violation(e),
            _ => false,
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Map a unique violation to [`DatabaseError::AlreadyExists`], passing
/// every other error through.
pub(crate) fn map_unique(err: sqlx::Error, entity: &'static str, id: impl Into<String>) -> DatabaseError {
    if is_unique_violation(&err) {
        return DatabaseError::AlreadyExists {
            entity,
            id: id.into(),
        };
    }
    DatabaseError::Sqlx(err)
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
