//! Upstream product catalog access.
//!
//! The catalog is a read-only, paginated source with two resource kinds:
//! accounts (authinfo, account details, sub-accounts of an aggregator) and
//! products (a merchant's listings). [`CatalogSource`] is the seam the sync
//! logic depends on; [`HttpCatalog`] talks to a Content API compatible
//! endpoint over HTTP.

mod client;
mod error;
mod types;

pub use client::{normalize_endpoint, HttpCatalog, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use error::CatalogError;
pub use types::{Account, AccountIdentifier, Page, Price, Product};

use async_trait::async_trait;

/// Read access to the upstream catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Accounts the authenticated identity can access.
    async fn authinfo(&self) -> Result<Vec<AccountIdentifier>, CatalogError>;

    /// Details for `account_id`, as seen from `merchant_id`.
    async fn get_account(&self, merchant_id: u64, account_id: u64)
        -> Result<Account, CatalogError>;

    /// One page of the sub-accounts managed by an aggregator.
    async fn list_subaccounts(
        &self,
        aggregator_id: u64,
        page_token: Option<&str>,
    ) -> Result<Page<Account>, CatalogError>;

    /// One page of a merchant's products.
    async fn list_products(
        &self,
        merchant_id: u64,
        page_token: Option<&str>,
    ) -> Result<Page<Product>, CatalogError>;
}
