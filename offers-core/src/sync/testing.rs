//! Test doubles for the sync layer.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::catalog::{Account, AccountIdentifier, CatalogError, CatalogSource, Page, Price, Product};
use crate::models::Offer;
use crate::store::{MemoryOfferStore, OfferStore, StoreError};

type PageKey = (u64, Option<String>);

pub(crate) fn product(id: &str, description: &str) -> Product {
    Product {
        id: id.to_string(),
        title: format!("Title {id}"),
        price: Some(Price {
            value: "9.99".to_string(),
            currency: "USD".to_string(),
        }),
        image_link: format!("https://img.example/{id}.png"),
        description: description.to_string(),
        link: format!("https://shop.example/{id}"),
    }
}

/// Catalog backed by canned pages keyed on `(account, page token)`.
///
/// Requesting a page that was never set fails with a 404 API error.
#[derive(Default)]
pub(crate) struct StaticCatalog {
    identifiers: Mutex<Vec<AccountIdentifier>>,
    accounts: Mutex<HashMap<u64, Account>>,
    subaccounts: Mutex<HashMap<PageKey, Page<Account>>>,
    products: Mutex<HashMap<PageKey, Page<Product>>>,
}

impl StaticCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_identifier(&self, aggregator_id: Option<u64>, merchant_id: Option<u64>) {
        self.identifiers.lock().unwrap().push(AccountIdentifier {
            aggregator_id,
            merchant_id,
        });
    }

    pub(crate) fn add_account(&self, id: u64, name: &str) {
        self.accounts.lock().unwrap().insert(
            id,
            Account {
                id,
                name: name.to_string(),
            },
        );
    }

    pub(crate) fn set_subaccounts(&self, aggregator_id: u64, token: Option<&str>, page: Page<Account>) {
        self.subaccounts
            .lock()
            .unwrap()
            .insert((aggregator_id, token.map(str::to_string)), page);
    }

    pub(crate) fn set_products(&self, merchant_id: u64, token: Option<&str>, page: Page<Product>) {
        self.products
            .lock()
            .unwrap()
            .insert((merchant_id, token.map(str::to_string)), page);
    }

    pub(crate) fn clear_products(&self) {
        self.products.lock().unwrap().clear();
    }
}

fn missing(what: String) -> CatalogError {
    CatalogError::Api {
        code: 404,
        message: format!("{what} not found"),
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn authinfo(&self) -> Result<Vec<AccountIdentifier>, CatalogError> {
        Ok(self.identifiers.lock().unwrap().clone())
    }

    async fn get_account(&self, _merchant_id: u64, account_id: u64) -> Result<Account, CatalogError> {
        self.accounts
            .lock()
            .unwrap()
            .get(&account_id)
            .cloned()
            .ok_or_else(|| missing(format!("account {account_id}")))
    }

    async fn list_subaccounts(
        &self,
        aggregator_id: u64,
        page_token: Option<&str>,
    ) -> Result<Page<Account>, CatalogError> {
        self.subaccounts
            .lock()
            .unwrap()
            .get(&(aggregator_id, page_token.map(str::to_string)))
            .cloned()
            .ok_or_else(|| missing(format!("sub-account page {page_token:?}")))
    }

    async fn list_products(
        &self,
        merchant_id: u64,
        page_token: Option<&str>,
    ) -> Result<Page<Product>, CatalogError> {
        self.products
            .lock()
            .unwrap()
            .get(&(merchant_id, page_token.map(str::to_string)))
            .cloned()
            .ok_or_else(|| missing(format!("product page {page_token:?}")))
    }
}

/// Memory store whose `fail_on`-th upsert (1-based) fails as unavailable.
pub(crate) struct FailingStore {
    inner: MemoryOfferStore,
    upserts: AtomicUsize,
    fail_on: usize,
}

impl FailingStore {
    pub(crate) fn new(inner: MemoryOfferStore, fail_on: usize) -> Self {
        Self {
            inner,
            upserts: AtomicUsize::new(0),
            fail_on,
        }
    }
}

#[async_trait]
impl OfferStore for FailingStore {
    async fn list(&self) -> Result<Vec<Offer>, StoreError> {
        self.inner.list().await
    }

    async fn get(&self, id: &str) -> Result<Offer, StoreError> {
        self.inner.get(id).await
    }

    async fn search(&self, text: &str) -> Result<Vec<Offer>, StoreError> {
        self.inner.search(text).await
    }

    async fn upsert(&self, offer: &Offer) -> Result<i64, StoreError> {
        let n = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        self.inner.upsert(offer).await
    }

    async fn begin_pass(&self) -> Result<(), StoreError> {
        self.inner.begin_pass().await
    }

    async fn sweep_untouched(&self) -> Result<u64, StoreError> {
        self.inner.sweep_untouched().await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}
