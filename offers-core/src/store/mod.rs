//! Offer persistence.
//!
//! [`OfferStore`] is the capability set every backend provides: bounded list,
//! lookup by ID, description search, upsert, and the mark-and-sweep pair
//! `begin_pass` / `sweep_untouched` used by a sync pass.
//!
//! Each stored row carries a `touched` flag next to the offer. The flag is
//! storage metadata only: it is cleared by `begin_pass`, set by `upsert`,
//! and consumed by `sweep_untouched`. It never appears on an [`Offer`].

mod error;
mod memory;
mod mysql;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryOfferStore;
pub use mysql::{MySqlConfig, MySqlOfferStore};
pub use sqlite::SqliteOfferStore;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::Offer;

/// Default cap on the number of offers returned by [`OfferStore::list`].
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Persistence for offers.
///
/// This trait is object-safe and is shared as `Arc<dyn OfferStore>` between
/// the read path and the sync driver.
#[async_trait]
pub trait OfferStore: Send + Sync {
    /// A bounded snapshot of stored offers, ordered by insertion.
    async fn list(&self) -> Result<Vec<Offer>, StoreError>;

    /// The offer with the given upstream ID.
    ///
    /// Fails with [`StoreError::NotFound`] on a miss.
    async fn get(&self, id: &str) -> Result<Offer, StoreError>;

    /// Offers whose description contains `text`, ignoring case.
    ///
    /// An empty result is reported as [`StoreError::NotFound`].
    async fn search(&self, text: &str) -> Result<Vec<Offer>, StoreError>;

    /// Inserts the offer, or updates the existing row with the same ID, and
    /// marks it touched. Returns the internal row ID.
    async fn upsert(&self, offer: &Offer) -> Result<i64, StoreError>;

    /// Clears the touched flag on every row. Called once when a pass starts.
    async fn begin_pass(&self) -> Result<(), StoreError>;

    /// Deletes every row not touched since the last `begin_pass` and returns
    /// how many were removed.
    async fn sweep_untouched(&self) -> Result<u64, StoreError>;

    /// Releases the underlying connections. Safe to call more than once.
    async fn close(&self);
}

/// Which backend to open, with its connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite { path: PathBuf },
    MySql(MySqlConfig),
    Memory,
}

/// Opens the configured backend, creating its schema if needed.
pub async fn open_store(
    backend: &StoreBackend,
    list_limit: u32,
) -> Result<Arc<dyn OfferStore>, StoreError> {
    let store: Arc<dyn OfferStore> = match backend {
        StoreBackend::Sqlite { path } => Arc::new(SqliteOfferStore::open(path, list_limit).await?),
        StoreBackend::MySql(config) => Arc::new(MySqlOfferStore::open(config, list_limit).await?),
        StoreBackend::Memory => Arc::new(MemoryOfferStore::new(list_limit)),
    };
    Ok(store)
}

// Row types shared by the SQL backends
#[derive(sqlx::FromRow)]
struct OfferRow {
    offer_id: String,
    title: Option<String>,
    price: Option<String>,
    currency: Option<String>,
    image_url: Option<String>,
    description: Option<String>,
    merchant_url: Option<String>,
}

impl From<OfferRow> for Offer {
    fn from(row: OfferRow) -> Self {
        Offer {
            id: row.offer_id,
            title: row.title.unwrap_or_default(),
            price: row.price.unwrap_or_default(),
            currency: row.currency.unwrap_or_default(),
            image_url: row.image_url.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            merchant_url: row.merchant_url.unwrap_or_default(),
        }
    }
}

fn ensure_writable(offer: &Offer) -> Result<(), StoreError> {
    if !offer.has_id() {
        return Err(StoreError::InvalidArgument(
            "offer with unassigned ID passed to upsert".to_string(),
        ));
    }
    Ok(())
}

fn expect_one_row(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected != 1 {
        return Err(StoreError::ConstraintViolation {
            expected: 1,
            actual: rows_affected,
        });
    }
    Ok(())
}

/// Exactly one row, or the matching error.
fn single_offer(id: &str, mut rows: Vec<OfferRow>) -> Result<Offer, StoreError> {
    match rows.len() {
        0 => Err(StoreError::NotFound(format!("offer '{id}'"))),
        1 => Ok(rows.remove(0).into()),
        n => Err(StoreError::ConstraintViolation {
            expected: 1,
            actual: n as u64,
        }),
    }
}

fn non_empty_matches(text: &str, offers: Vec<Offer>) -> Result<Vec<Offer>, StoreError> {
    if offers.is_empty() {
        return Err(StoreError::NotFound(format!(
            "offer with description matching '{text}'"
        )));
    }
    Ok(offers)
}

/// Case folding applied to descriptions and search text alike.
///
/// SQL `LOWER()` is ASCII-only in SQLite, so the SQL backends store this
/// fold in `description_folded` and match against that.
fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Escape character used in `LIKE ... ESCAPE '!'` clauses.
const LIKE_ESCAPE: char = '!';

/// Builds a lowercase `%text%` pattern with LIKE wildcards escaped.
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in fold_case(text).chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Boots"), "%boots%");
        assert_eq!(contains_pattern("50%_off!"), "%50!%!_off!!%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn test_contains_pattern_folds_non_ascii() {
        assert_eq!(contains_pattern("CRÈME"), "%crème%");
        assert_eq!(fold_case("BRÛLÉE Kit"), "brûlée kit");
    }

    #[test]
    fn test_expect_one_row() {
        assert!(expect_one_row(1).is_ok());
        assert!(matches!(
            expect_one_row(0),
            Err(StoreError::ConstraintViolation {
                expected: 1,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_ensure_writable_rejects_empty_id() {
        let err = ensure_writable(&Offer::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert!(ensure_writable(&Offer::new("x")).is_ok());
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let store = open_store(&StoreBackend::Memory, DEFAULT_LIST_LIMIT)
            .await
            .unwrap();
        store.upsert(&Offer::new("a")).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_open_sqlite_backend() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = StoreBackend::Sqlite {
            path: temp_dir.path().join("nested").join("offers.db"),
        };

        let store = open_store(&backend, DEFAULT_LIST_LIMIT).await.unwrap();
        store.upsert(&Offer::new("a")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
        store.close().await;
    }
}
