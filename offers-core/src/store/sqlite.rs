use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use super::{
    contains_pattern, ensure_writable, expect_one_row, fold_case, non_empty_matches,
    single_offer, OfferRow, OfferStore, StoreError,
};
use crate::models::Offer;

/// Offer store backed by a SQLite file.
///
/// The schema is managed by the embedded migrations in `migrations/`, which
/// run every time the store is opened.
pub struct SqliteOfferStore {
    pool: SqlitePool,
    list_limit: u32,
}

impl SqliteOfferStore {
    /// Opens (creating if missing) the database at `path` and migrates it.
    pub async fn open(path: &Path, list_limit: u32) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StoreError::Connection)?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(path = %path.display(), "opened sqlite offer store");
        Ok(Self { pool, list_limit })
    }
}

#[async_trait]
impl OfferStore for SqliteOfferStore {
    async fn list(&self) -> Result<Vec<Offer>, StoreError> {
        let rows: Vec<OfferRow> = sqlx::query_as(
            r#"
            SELECT offer_id, title, price, currency, image_url, description, merchant_url
            FROM offers
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(i64::from(self.list_limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Offer::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Offer, StoreError> {
        let rows: Vec<OfferRow> = sqlx::query_as(
            r#"
            SELECT offer_id, title, price, currency, image_url, description, merchant_url
            FROM offers
            WHERE offer_id = ?
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        single_offer(id, rows)
    }

    async fn search(&self, text: &str) -> Result<Vec<Offer>, StoreError> {
        let rows: Vec<OfferRow> = sqlx::query_as(
            r#"
            SELECT offer_id, title, price, currency, image_url, description, merchant_url
            FROM offers
            WHERE description_folded LIKE ? ESCAPE '!'
            ORDER BY id
            "#,
        )
        .bind(contains_pattern(text))
        .fetch_all(&self.pool)
        .await?;

        non_empty_matches(text, rows.into_iter().map(Offer::from).collect())
    }

    async fn upsert(&self, offer: &Offer) -> Result<i64, StoreError> {
        ensure_writable(offer)?;

        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM offers WHERE offer_id = ?")
            .bind(&offer.id)
            .fetch_optional(&mut *tx)
            .await?;

        let row_id = match existing {
            Some(row_id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE offers
                    SET title = ?, price = ?, currency = ?, image_url = ?,
                        description = ?, description_folded = ?, merchant_url = ?,
                        touched = 1
                    WHERE id = ?
                    "#,
                )
                .bind(&offer.title)
                .bind(&offer.price)
                .bind(&offer.currency)
                .bind(&offer.image_url)
                .bind(&offer.description)
                .bind(fold_case(&offer.description))
                .bind(&offer.merchant_url)
                .bind(row_id)
                .execute(&mut *tx)
                .await?;
                expect_one_row(result.rows_affected())?;
                row_id
            }
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO offers (offer_id, title, price, currency, image_url,
                                        description, description_folded, merchant_url, touched)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
                    "#,
                )
                .bind(&offer.id)
                .bind(&offer.title)
                .bind(&offer.price)
                .bind(&offer.currency)
                .bind(&offer.image_url)
                .bind(&offer.description)
                .bind(fold_case(&offer.description))
                .bind(&offer.merchant_url)
                .execute(&mut *tx)
                .await?;
                expect_one_row(result.rows_affected())?;
                result.last_insert_rowid()
            }
        };

        tx.commit().await?;
        tracing::debug!(offer_id = %offer.id, row_id, "upserted offer");
        Ok(row_id)
    }

    async fn begin_pass(&self) -> Result<(), StoreError> {
        sqlx::query("UPDATE offers SET touched = 0")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sweep_untouched(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM offers WHERE touched = 0")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct TestContext {
        store: SqliteOfferStore,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_store() -> TestContext {
        setup_store_with_limit(crate::store::DEFAULT_LIST_LIMIT).await
    }

    async fn setup_store_with_limit(list_limit: u32) -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("offers.db");
        let store = SqliteOfferStore::open(&db_path, list_limit).await.unwrap();
        TestContext {
            store,
            _temp_dir: temp_dir,
        }
    }

    async fn row_count(store: &SqliteOfferStore, offer_id: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM offers WHERE offer_id = ?")
            .bind(offer_id)
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    async fn is_touched(store: &SqliteOfferStore, offer_id: &str) -> bool {
        sqlx::query_scalar("SELECT touched FROM offers WHERE offer_id = ?")
            .bind(offer_id)
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    fn boots() -> Offer {
        Offer::new("online:en:US:boots")
            .with_title("Hiking Boots")
            .with_price("89.00", "USD")
            .with_image_url("https://img.example.com/boots.png")
            .with_description("Waterproof leather hiking boots")
            .with_merchant_url("https://shop.example.com/boots")
    }

    #[tokio::test]
    async fn test_open_creates_offers_table() {
        let ctx = setup_store().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&ctx.store.pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(table_names, vec!["offers"]);
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("offers.db");

        let store = SqliteOfferStore::open(&db_path, 50).await.unwrap();
        store.upsert(&boots()).await.unwrap();
        store.close().await;

        let store = SqliteOfferStore::open(&db_path, 50).await.unwrap();
        assert_eq!(store.get("online:en:US:boots").await.unwrap(), boots());
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let row_id = store.upsert(&boots()).await.unwrap();
        assert!(row_id > 0);

        let fetched = store.get("online:en:US:boots").await.unwrap();
        assert_eq!(fetched, boots());
        assert!(is_touched(store, "online:en:US:boots").await);
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_row() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let first = store.upsert(&boots()).await.unwrap();
        let second = store.upsert(&boots()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(row_count(store, "online:en:US:boots").await, 1);
        assert_eq!(store.get("online:en:US:boots").await.unwrap(), boots());
    }

    #[tokio::test]
    async fn test_upsert_updates_fields_in_place() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let row_id = store.upsert(&boots()).await.unwrap();

        let mut changed = boots();
        changed.price = "79.00".to_string();
        changed.description = "On sale".to_string();
        let updated_id = store.upsert(&changed).await.unwrap();

        assert_eq!(row_id, updated_id);
        let fetched = store.get("online:en:US:boots").await.unwrap();
        assert_eq!(fetched.price, "79.00");
        assert_eq!(fetched.description, "On sale");
        assert_eq!(fetched.title, "Hiking Boots");
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_id() {
        let ctx = setup_store().await;

        let err = ctx.store.upsert(&Offer::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert!(ctx.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let ctx = setup_store().await;

        let err = ctx.store.get("nonexistent-id").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_is_capped_and_ordered() {
        let ctx = setup_store_with_limit(3).await;
        let store = &ctx.store;

        for id in ["c", "a", "e", "b", "d"] {
            store.upsert(&Offer::new(id)).await.unwrap();
        }

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "e"]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_on_description() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store.upsert(&boots()).await.unwrap();
        store
            .upsert(
                &Offer::new("sandals")
                    .with_title("Hiking Sandals")
                    .with_description("Light summer sandals"),
            )
            .await
            .unwrap();
        store
            .upsert(&Offer::new("socks").with_description("Wool HIKING socks"))
            .await
            .unwrap();

        let ids: Vec<String> = store
            .search("hiking")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        // Title matches don't count
        assert_eq!(ids, vec!["online:en:US:boots", "socks"]);
    }

    #[tokio::test]
    async fn test_search_is_not_capped_by_list_limit() {
        let ctx = setup_store_with_limit(2).await;
        let store = &ctx.store;

        for i in 0..5 {
            store
                .upsert(&Offer::new(format!("o{i}")).with_description("blue widget"))
                .await
                .unwrap();
        }

        assert_eq!(store.search("widget").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store
            .upsert(&Offer::new("sale").with_description("Now 50% off"))
            .await
            .unwrap();
        store
            .upsert(&Offer::new("plain").with_description("Now 50 off"))
            .await
            .unwrap();

        let results = store.search("50%").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "sale");

        assert!(store.search("_").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case_like_memory_store() {
        let ctx = setup_store().await;
        let memory = crate::store::MemoryOfferStore::new(crate::store::DEFAULT_LIST_LIMIT);
        let creme = Offer::new("c").with_description("CRÈME BRÛLÉE kit");

        ctx.store.upsert(&creme).await.unwrap();
        memory.upsert(&creme).await.unwrap();

        for query in ["crème", "BRÛLÉE", "Brûlée KIT"] {
            let from_sqlite = ctx.store.search(query).await.unwrap();
            let from_memory = memory.search(query).await.unwrap();
            assert_eq!(from_sqlite, vec![creme.clone()], "query {query:?}");
            assert_eq!(from_sqlite, from_memory, "query {query:?}");
        }
    }

    #[tokio::test]
    async fn test_search_tracks_updated_description() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store
            .upsert(&Offer::new("c").with_description("ÉCHARPE en laine"))
            .await
            .unwrap();
        assert_eq!(store.search("écharpe").await.unwrap().len(), 1);

        store
            .upsert(&Offer::new("c").with_description("Wool scarf"))
            .await
            .unwrap();
        assert!(store.search("écharpe").await.unwrap_err().is_not_found());
        assert_eq!(store.search("WOOL").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_without_match_is_not_found() {
        let ctx = setup_store().await;
        ctx.store.upsert(&boots()).await.unwrap();

        let err = ctx.store.search("umbrella").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_untouched() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        for id in ["A", "B", "C"] {
            store.upsert(&Offer::new(id)).await.unwrap();
        }

        store.begin_pass().await.unwrap();
        assert!(!is_touched(store, "A").await);

        store.upsert(&Offer::new("A")).await.unwrap();
        store.upsert(&Offer::new("B")).await.unwrap();

        let swept = store.sweep_untouched().await.unwrap();
        assert_eq!(swept, 1);

        let mut ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(store.get("C").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_sweep_with_nothing_to_delete() {
        let ctx = setup_store().await;

        assert_eq!(ctx.store.sweep_untouched().await.unwrap(), 0);

        ctx.store.upsert(&boots()).await.unwrap();
        assert_eq!(ctx.store.sweep_untouched().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let ctx = setup_store().await;

        ctx.store.close().await;
        ctx.store.close().await;

        let err = ctx.store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
        assert!(err.is_unavailable());
    }
}
