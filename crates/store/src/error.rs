use thiserror::Error;

use crate::memory::FaultPoint;

/// Errors that can occur when interacting with the shop store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A failure injected into the in-memory store.
    #[error("Injected fault at {operation} (transient: {transient})")]
    Fault {
        operation: FaultPoint,
        transient: bool,
    },

    /// A row violated a uniqueness rule.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped back into a record.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

impl StoreError {
    /// Returns true if the failed transaction can be safely retried.
    ///
    /// Postgres reports serialization failures as `40001` and deadlocks as
    /// `40P01`. Both abort the transaction before anything commits.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
            }
            StoreError::Database(sqlx::Error::PoolTimedOut) => true,
            StoreError::Fault { transient, .. } => *transient,
            _ => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
