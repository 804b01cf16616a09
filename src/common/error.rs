//! Error types for the disk-quota accounting store.

use thiserror::Error;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors surfaced by the store.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation submitted after the store (or its worker) was closed.
    #[error("store is closed")]
    StoreClosed,

    /// Queried tile-set id has no row.
    #[error("no such tile set: {0}")]
    NoSuchTileSet(String),

    /// Queried layer has zero tile sets.
    #[error("no such layer: {0}")]
    NoSuchLayer(String),

    /// A synchronous wait on a submitted unit of work was canceled.
    #[error("interrupted while waiting for store operation")]
    Interrupted,

    /// The global quota row is missing while the store is open.
    ///
    /// Fatal: every open store must have seeded this row during reconciliation.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Underlying persistent store engine failure (I/O, corruption, encoding).
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

/// Wraps the concrete failures that can arise from the embedded storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sled(#[from] sled::Error),

    #[error(transparent)]
    Encode(#[from] bincode::Error),
}

impl<T> From<sled::transaction::TransactionError<T>> for Error
where
    T: Into<Error>,
{
    fn from(err: sled::transaction::TransactionError<T>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(inner) => inner.into(),
            sled::transaction::TransactionError::Storage(e) => {
                Error::StorageFailure(StorageError::Sled(e))
            }
        }
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::StorageFailure(StorageError::Sled(err))
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::StorageFailure(StorageError::Encode(err))
    }
}
