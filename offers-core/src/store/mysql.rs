//! MySQL-backed offer store.
//!
//! Unlike the SQLite backend, the schema is bootstrapped by probing: connect
//! without a database, `USE` it, then `DESCRIBE` the table. Only the
//! "unknown database" and "no such table" server errors lead to creating the
//! schema; anything else is a connection failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::mysql::{
    MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlPool, MySqlPoolOptions,
};
use sqlx::{Connection, Executor};
use std::path::PathBuf;

use super::{
    contains_pattern, ensure_writable, expect_one_row, fold_case, non_empty_matches,
    single_offer, OfferRow, OfferStore, StoreError,
};
use crate::models::Offer;

/// MySQL error 1049: unknown database.
const ER_BAD_DB_ERROR: u16 = 1049;
/// MySQL error 1146: table doesn't exist.
const ER_NO_SUCH_TABLE: u16 = 1146;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS offers (
    id BIGINT NOT NULL AUTO_INCREMENT,
    offer_id VARCHAR(255) NOT NULL,
    title TEXT NULL,
    price VARCHAR(255) NULL,
    currency VARCHAR(255) NULL,
    image_url TEXT NULL,
    description TEXT NULL,
    description_folded TEXT NOT NULL,
    merchant_url TEXT NULL,
    touched BOOLEAN NOT NULL DEFAULT 0,
    PRIMARY KEY (id),
    UNIQUE KEY offers_offer_id (offer_id)
)"#;

/// Brings a table created before the lowercased description column up to date.
const UPGRADE_TABLE: [&str; 2] = [
    "ALTER TABLE offers ADD COLUMN description_folded TEXT NOT NULL",
    "UPDATE offers SET description_folded = LOWER(COALESCE(description, ''))",
];

/// Connection parameters for a MySQL server.
///
/// Either `host`/`port` or `unix_socket` addresses the server; when a socket
/// is set it wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlConfig {
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub unix_socket: Option<PathBuf>,
    pub database: String,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            host: "localhost".to_string(),
            port: 3306,
            unix_socket: None,
            database: "library".to_string(),
        }
    }
}

impl MySqlConfig {
    /// Connection options, optionally selecting the configured database.
    pub fn connect_options(&self, with_database: bool) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new();
        options = match &self.unix_socket {
            Some(socket) => options.socket(socket),
            None => options.host(&self.host).port(self.port),
        };
        if let Some(username) = &self.username {
            options = options.username(username);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        if with_database {
            options = options.database(&self.database);
        }
        options
    }

    /// Human-readable address with the password redacted, for logs.
    pub fn describe(&self) -> String {
        let mut cred = String::new();
        if let Some(username) = &self.username {
            cred.push_str(username);
            if self.password.is_some() {
                cred.push_str(":***");
            }
            cred.push('@');
        }

        match &self.unix_socket {
            Some(socket) => format!("{}unix({})/{}", cred, socket.display(), self.database),
            None => format!("{}tcp([{}]:{})/{}", cred, self.host, self.port, self.database),
        }
    }

    fn validate_database_name(&self) -> Result<(), StoreError> {
        let valid = !self.database.is_empty()
            && self
                .database
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if !valid {
            return Err(StoreError::InvalidArgument(format!(
                "invalid MySQL database name '{}'",
                self.database
            )));
        }
        Ok(())
    }
}

/// Offer store backed by a MySQL server.
pub struct MySqlOfferStore {
    pool: MySqlPool,
    list_limit: u32,
}

impl MySqlOfferStore {
    /// Ensures the database and table exist, then opens a pool on them.
    pub async fn open(config: &MySqlConfig, list_limit: u32) -> Result<Self, StoreError> {
        config.validate_database_name()?;
        ensure_schema(config).await?;

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect_with(config.connect_options(true))
            .await
            .map_err(StoreError::Connection)?;

        tracing::info!(server = %config.describe(), "opened mysql offer store");
        Ok(Self { pool, list_limit })
    }
}

fn mysql_error_number(error: &sqlx::Error) -> Option<u16> {
    error
        .as_database_error()?
        .try_downcast_ref::<MySqlDatabaseError>()
        .map(MySqlDatabaseError::number)
}

async fn ensure_schema(config: &MySqlConfig) -> Result<(), StoreError> {
    let mut conn = MySqlConnection::connect_with(&config.connect_options(false))
        .await
        .map_err(StoreError::Connection)?;
    conn.ping().await.map_err(StoreError::Connection)?;

    let result = inspect_schema(&mut conn, &config.database).await;
    let _ = conn.close().await;
    result
}

async fn inspect_schema(conn: &mut MySqlConnection, database: &str) -> Result<(), StoreError> {
    let use_database = format!("USE `{database}`");
    if let Err(e) = sqlx::raw_sql(&use_database).execute(&mut *conn).await {
        if mysql_error_number(&e) == Some(ER_BAD_DB_ERROR) {
            return create_schema(conn, database).await;
        }
        return Err(StoreError::Connection(e));
    }

    match sqlx::raw_sql("DESCRIBE offers").execute(&mut *conn).await {
        Ok(_) => upgrade_schema(conn).await,
        Err(e) if mysql_error_number(&e) == Some(ER_NO_SUCH_TABLE) => {
            create_schema(conn, database).await
        }
        Err(e) => Err(StoreError::Connection(e)),
    }
}

async fn upgrade_schema(conn: &mut MySqlConnection) -> Result<(), StoreError> {
    let folded_column = (&mut *conn)
        .fetch_optional(sqlx::raw_sql(
            "SHOW COLUMNS FROM offers LIKE 'description_folded'",
        ))
        .await
        .map_err(StoreError::Connection)?;
    if folded_column.is_some() {
        return Ok(());
    }

    tracing::info!("adding description_folded column to offers");
    for statement in UPGRADE_TABLE {
        sqlx::raw_sql(statement)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::Connection)?;
    }
    Ok(())
}

async fn create_schema(conn: &mut MySqlConnection, database: &str) -> Result<(), StoreError> {
    tracing::info!(database, "creating offers schema");

    let statements = [
        format!(
            "CREATE DATABASE IF NOT EXISTS `{database}` DEFAULT CHARACTER SET = 'utf8mb4' DEFAULT COLLATE 'utf8mb4_general_ci'"
        ),
        format!("USE `{database}`"),
        CREATE_TABLE.to_string(),
    ];
    for statement in &statements {
        sqlx::raw_sql(statement)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::Connection)?;
    }
    Ok(())
}

#[async_trait]
impl OfferStore for MySqlOfferStore {
    async fn list(&self) -> Result<Vec<Offer>, StoreError> {
        let rows: Vec<OfferRow> = sqlx::query_as(
            r#"
            SELECT offer_id, title, price, currency, image_url, description, merchant_url
            FROM offers
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(self.list_limit)
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

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM offers WHERE offer_id = ? FOR UPDATE")
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
                        touched = TRUE
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
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, TRUE)
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
                i64::try_from(result.last_insert_id()).map_err(|_| {
                    StoreError::InvalidArgument(format!(
                        "row id {} out of range",
                        result.last_insert_id()
                    ))
                })?
            }
        };

        tx.commit().await?;
        tracing::debug!(offer_id = %offer.id, row_id, "upserted offer");
        Ok(row_id)
    }

    async fn begin_pass(&self) -> Result<(), StoreError> {
        sqlx::query("UPDATE offers SET touched = FALSE")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sweep_untouched(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM offers WHERE touched = FALSE")
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

    #[test]
    fn test_default_config() {
        let config = MySqlConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert_eq!(config.database, "library");
        assert!(config.unix_socket.is_none());
    }

    #[test]
    fn test_describe_tcp_redacts_password() {
        let config = MySqlConfig {
            username: Some("root".to_string()),
            password: Some("hunter2".to_string()),
            ..MySqlConfig::default()
        };
        let described = config.describe();
        assert_eq!(described, "root:***@tcp([localhost]:3306)/library");
        assert!(!described.contains("hunter2"));
    }

    #[test]
    fn test_describe_unix_socket() {
        let config = MySqlConfig {
            username: Some("app".to_string()),
            unix_socket: Some(PathBuf::from("/cloudsql/project:region:instance")),
            ..MySqlConfig::default()
        };
        assert_eq!(
            config.describe(),
            "app@unix(/cloudsql/project:region:instance)/library"
        );
    }

    #[test]
    fn test_describe_without_credentials() {
        assert_eq!(
            MySqlConfig::default().describe(),
            "tcp([localhost]:3306)/library"
        );
    }

    #[test]
    fn test_database_name_validation() {
        assert!(MySqlConfig::default().validate_database_name().is_ok());

        for bad in ["", "lib`; DROP TABLE offers", "my-db", "a b"] {
            let config = MySqlConfig {
                database: bad.to_string(),
                ..MySqlConfig::default()
            };
            assert!(matches!(
                config.validate_database_name(),
                Err(StoreError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_password_not_serialized() {
        let config = MySqlConfig {
            password: Some("hunter2".to_string()),
            ..MySqlConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_free_text_columns_are_unbounded() {
        for column in ["title", "image_url", "merchant_url", "description", "description_folded"] {
            let line = CREATE_TABLE
                .lines()
                .find(|l| l.trim_start().starts_with(&format!("{column} ")))
                .unwrap();
            assert!(line.contains("TEXT"), "{column}: {line}");
        }
        assert!(UPGRADE_TABLE[0].contains("description_folded"));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_construction() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = MySqlConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..MySqlConfig::default()
        };
        let result = MySqlOfferStore::open(&config, 50).await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
