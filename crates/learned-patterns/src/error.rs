//! Error types for learned-pattern operations.

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while saving or resolving learned patterns.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Persistence failure other than a handled duplicate.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Every attempt to create or recover a group for the rule failed.
    #[error("no group could be resolved for rule {rule_id}")]
    GroupUnavailable { rule_id: String },
}

/// Result type for learned-pattern operations.
pub type Result<T> = std::result::Result<T, PatternError>;
