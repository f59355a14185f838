//! Offer store error types.

use thiserror::Error;

/// Errors returned by [`OfferStore`](super::OfferStore) implementations.
///
/// Stores never retry; every failure is handed straight back to the caller.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Opening or pinging the backend failed. Only raised during construction.
    #[error("Could not connect to the offer store: {0}")]
    Connection(#[source] sqlx::Error),

    /// Applying the embedded schema migrations failed.
    #[error("Offer store migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Preparing the on-disk location for the store failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No offer matched.
    #[error("{0} not found")]
    NotFound(String),

    /// A write was attempted with malformed input, e.g. an empty offer ID.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A write meant to touch exactly one row touched some other number.
    #[error("Expected {expected} row(s) affected, got {actual}")]
    ConstraintViolation { expected: u64, actual: u64 },

    /// The backend failed an individual operation.
    #[error("Offer store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// The store has been closed.
    #[error("Offer store is closed")]
    Closed,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether the failure came from the backend rather than the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Closed | StoreError::Connection(_)
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolClosed => StoreError::Closed,
            other => StoreError::Unavailable(other),
        }
    }
}
