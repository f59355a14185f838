use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{ReconcileReport, Reconciler, SyncError};
use crate::catalog::{AccountIdentifier, CatalogSource};
use crate::store::OfferStore;

/// Outcome of one completed sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub account_id: u64,
    pub aggregator: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub reconcile: ReconcileReport,
}

/// Runs end-to-end sync passes against a catalog and a store.
#[derive(Clone)]
pub struct SyncDriver {
    catalog: Arc<dyn CatalogSource>,
    store: Arc<dyn OfferStore>,
}

impl SyncDriver {
    pub fn new(catalog: Arc<dyn CatalogSource>, store: Arc<dyn OfferStore>) -> Self {
        Self { catalog, store }
    }

    /// Runs one pass.
    ///
    /// Without an explicit account, the first account the credentials can
    /// access is used. Errors end the pass immediately; nothing is retried.
    pub async fn run(&self, account_id: Option<u64>) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();

        let identifiers = self.catalog.authinfo().await?;
        let account_id = match account_id {
            Some(id) => id,
            None => default_account(&identifiers)?,
        };
        let aggregator = is_aggregator(account_id, &identifiers);

        tracing::info!(account_id, aggregator, "Starting sync pass");

        let account = self.catalog.get_account(account_id, account_id).await?;
        let result = Reconciler::new(self.catalog.as_ref(), self.store.as_ref())
            .reconcile(&account, aggregator)
            .await;

        let reconcile = match result {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(account_id, error = %e, "Sync pass failed");
                return Err(e);
            }
        };

        let report = SyncReport {
            account_id,
            aggregator,
            started_at,
            finished_at: Utc::now(),
            reconcile,
        };
        tracing::info!(
            account_id,
            upserted = reconcile.offers_upserted,
            swept = reconcile.offers_swept,
            pages = reconcile.pages_fetched,
            "Sync pass complete"
        );
        Ok(report)
    }
}

/// The first accessible account, preferring its aggregator ID.
fn default_account(identifiers: &[AccountIdentifier]) -> Result<u64, SyncError> {
    identifiers
        .first()
        .and_then(|first| first.aggregator_id.or(first.merchant_id))
        .ok_or_else(|| {
            SyncError::Config(
                "the credentials do not have access to any accounts; \
                 set a merchant ID explicitly"
                    .to_string(),
            )
        })
}

/// Whether `account_id` is listed as an aggregator.
///
/// Identifiers are checked in order and the first one naming the account
/// decides. An unlisted account is treated as a standalone merchant.
fn is_aggregator(account_id: u64, identifiers: &[AccountIdentifier]) -> bool {
    for identifier in identifiers {
        if identifier.merchant_id == Some(account_id) {
            return false;
        }
        if identifier.aggregator_id == Some(account_id) {
            return true;
        }
    }
    false
}
