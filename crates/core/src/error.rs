//! Unified error types for rosterdb.
//!
//! Expected negative outcomes (duplicate key, missing id, no whitelisted
//! field changed) are signaled by `Ok(false)`, never by an error; only
//! genuinely exceptional conditions appear here.

use thiserror::Error;

/// All rosterdb errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A transaction slot or pooled connection was not acquired in time.
    #[error("acquisition timed out: {0}")]
    Timeout(String),

    /// Operation attempted after the transaction committed or rolled back.
    #[error("transaction is no longer valid")]
    InvalidTransaction,

    /// Foreign-key violation, at insert- or delete-time.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Generic backend failure wrapping a driver-level fault.
    #[error("database error: {0}")]
    Database(String),

    /// An operation failed and the compensating rollback/restore failed
    /// too. The original failure stays primary; the compensation failure
    /// rides along instead of replacing it.
    #[error("{source} (rollback also failed: {rollback})")]
    RollbackFailed {
        source: Box<Error>,
        rollback: Box<Error>,
    },
}

/// Result type for rosterdb operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach a compensation failure to this error.
    pub fn with_rollback_failure(self, rollback: Error) -> Error {
        Error::RollbackFailed {
            source: Box::new(self),
            rollback: Box::new(rollback),
        }
    }

    /// The original failure, unwrapping any compensation layers.
    pub fn original(&self) -> &Error {
        match self {
            Error::RollbackFailed { source, .. } => source.original(),
            other => other,
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self.original(), Error::Timeout(_))
    }

    /// Check if this is a constraint violation.
    pub fn is_constraint(&self) -> bool {
        matches!(self.original(), Error::Constraint(_))
    }

    /// Check if this is a use-after-destroy error.
    pub fn is_invalid_transaction(&self) -> bool {
        matches!(self.original(), Error::InvalidTransaction)
    }
}
