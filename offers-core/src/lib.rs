//! Offers Core Library
//!
//! Offer storage, upstream catalog access, and the sync pass that mirrors
//! one into the other. Shared by the `offers` CLI and the read server.

pub mod catalog;
pub mod models;
pub mod store;
pub mod sync;

pub use catalog::{CatalogError, CatalogSource, HttpCatalog};
pub use models::Offer;
pub use store::{open_store, OfferStore, StoreBackend, StoreError};
pub use sync::{ReconcileReport, SyncDriver, SyncError, SyncReport};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
