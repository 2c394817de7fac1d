use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Incomplete database config: {0}")]
    IncompleteConfig(String),

    #[error("Invalid database connection string: {0}")]
    InvalidDsn(String),

    #[error("Failed opening database connection: {0}")]
    Open(#[source] sqlx::Error),

    #[error("Database connection failed: {0}")]
    Ping(#[source] sqlx::Error),

    #[error("Database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] CoreError),

    #[error("Stored record could not be decoded: {0}")]
    Decode(String),

    #[error("The requested data was not found in the database.")]
    NotFound,
}

/// Failure of a unit of work run through `Database::with_transaction`.
///
/// `E` is the error type of the caller's function; it is always handed back,
/// never replaced by a driver error.
#[derive(Error, Debug)]
pub enum TransactionError<E> {
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] sqlx::Error),

    /// The function failed and the transaction was rolled back.
    #[error(transparent)]
    Aborted(E),

    /// The function failed and the rollback failed too.
    #[error("{cause}: rolling back transaction: {rollback}")]
    RollbackFailed {
        #[source]
        cause: E,
        rollback: sqlx::Error,
    },

    /// The function succeeded but the commit did not.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),
}

impl<E> TransactionError<E> {
    /// The caller's own error, if the function failed.
    pub fn cause(&self) -> Option<&E> {
        match self {
            TransactionError::Aborted(cause) | TransactionError::RollbackFailed { cause, .. } => {
                Some(cause)
            }
            TransactionError::Begin(_) | TransactionError::Commit(_) => None,
        }
    }

    pub fn into_cause(self) -> Option<E> {
        match self {
            TransactionError::Aborted(cause) | TransactionError::RollbackFailed { cause, .. } => {
                Some(cause)
            }
            TransactionError::Begin(_) | TransactionError::Commit(_) => None,
        }
    }
}
