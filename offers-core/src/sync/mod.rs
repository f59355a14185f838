//! Mirroring the upstream catalog into an offer store.
//!
//! A pass is driven by [`SyncDriver`], which resolves the target account and
//! hands it to a [`Reconciler`]. The reconciler resets the store's touched
//! flags, upserts every product the catalog returns, and sweeps whatever was
//! not touched once pagination has completed without error.

mod driver;
mod error;
mod reconciler;
#[cfg(test)]
pub(crate) mod testing;

pub use driver::{SyncDriver, SyncReport};
pub use error::SyncError;
pub use reconciler::{ReconcileReport, Reconciler};
