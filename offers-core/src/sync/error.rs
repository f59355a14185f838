use thiserror::Error;

use crate::catalog::CatalogError;
use crate::store::StoreError;

/// Errors that end a sync pass.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The pass could not resolve an account to mirror.
    #[error("Configuration error: {0}")]
    Config(String),
}
