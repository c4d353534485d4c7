//! Error types for automation operations.

use thiserror::Error;

/// Errors that can occur while running automation.
///
/// Delivery failures are deliberately absent: the dispatcher records them
/// in email history and moves on, so they never bubble up as errors.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Persistence failure.
    #[error("database error: {0}")]
    Database(#[from] database::DatabaseError),

    /// Template rendering failure.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    /// A stage change the pipeline does not allow.
    #[error("invalid stage transition: {from} -> {to}")]
    InvalidTransition {
        from: database::Stage,
        to: database::Stage,
    },
}

/// Result type for automation operations.
pub type Result<T> = std::result::Result<T, AutomationError>;
