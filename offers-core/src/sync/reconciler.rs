use serde::Serialize;

use super::SyncError;
use crate::catalog::{Account, CatalogError, CatalogSource};
use crate::models::Offer;
use crate::store::OfferStore;

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Merchant accounts whose products were walked.
    pub accounts_visited: u64,
    /// Product and sub-account pages fetched.
    pub pages_fetched: u64,
    pub offers_upserted: u64,
    pub offers_swept: u64,
}

/// Walks the catalog for one account and mirrors it into the store.
pub struct Reconciler<'a> {
    catalog: &'a dyn CatalogSource,
    store: &'a dyn OfferStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(catalog: &'a dyn CatalogSource, store: &'a dyn OfferStore) -> Self {
        Self { catalog, store }
    }

    /// Runs one pass for `account`.
    ///
    /// For an aggregator, the products of every sub-account are mirrored.
    /// The sweep only runs when every page was fetched and every upsert
    /// succeeded; on error the rows written so far stay in place.
    pub async fn reconcile(
        &self,
        account: &Account,
        is_aggregator: bool,
    ) -> Result<ReconcileReport, SyncError> {
        let mut report = ReconcileReport::default();

        self.store.begin_pass().await?;

        if is_aggregator {
            self.reconcile_subaccounts(account.id, &mut report).await?;
        } else {
            self.reconcile_products(account, &mut report).await?;
        }

        report.offers_swept = self.store.sweep_untouched().await?;
        tracing::info!(
            account_id = account.id,
            swept = report.offers_swept,
            "Swept offers no longer listed upstream"
        );

        Ok(report)
    }

    async fn reconcile_subaccounts(
        &self,
        aggregator_id: u64,
        report: &mut ReconcileReport,
    ) -> Result<(), SyncError> {
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .catalog
                .list_subaccounts(aggregator_id, page_token.as_deref())
                .await?;
            report.pages_fetched += 1;
            tracing::debug!(
                aggregator_id,
                subaccounts = page.resources.len(),
                "Fetched sub-account page"
            );

            for subaccount in &page.resources {
                self.reconcile_products(subaccount, report).await?;
            }

            match next_page_token(page_token.as_deref(), page.next_token())? {
                Some(token) => page_token = Some(token),
                None => return Ok(()),
            }
        }
    }

    async fn reconcile_products(
        &self,
        account: &Account,
        report: &mut ReconcileReport,
    ) -> Result<(), SyncError> {
        tracing::info!(account_id = account.id, name = %account.name, "Mirroring account");
        report.accounts_visited += 1;

        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .catalog
                .list_products(account.id, page_token.as_deref())
                .await?;
            report.pages_fetched += 1;
            tracing::debug!(
                account_id = account.id,
                products = page.resources.len(),
                "Fetched product page"
            );

            let next = next_page_token(page_token.as_deref(), page.next_token())?;

            for product in page.resources {
                let offer = Offer::from(product);
                let row_id = self.store.upsert(&offer).await?;
                report.offers_upserted += 1;
                tracing::debug!(offer_id = %offer.id, row_id, "Upserted offer");
            }

            match next {
                Some(token) => page_token = Some(token),
                None => return Ok(()),
            }
        }
    }
}

/// The token for the following request, or `None` after the last page.
///
/// A source that hands back the token it was just given would be walked
/// forever, so that is reported as [`CatalogError::PaginationLoop`].
fn next_page_token(
    requested: Option<&str>,
    returned: Option<&str>,
) -> Result<Option<String>, CatalogError> {
    match returned {
        None => Ok(None),
        Some(token) if requested == Some(token) => {
            Err(CatalogError::PaginationLoop(token.to_string()))
        }
        Some(token) => Ok(Some(token.to_string())),
    }
}
