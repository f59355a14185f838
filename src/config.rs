use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use offers_core::catalog::{normalize_endpoint, HttpCatalog, DEFAULT_ENDPOINT};
use offers_core::store::{MySqlConfig, StoreBackend, DEFAULT_LIST_LIMIT};
use offers_core::CatalogError;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Which offer store backend to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Mysql,
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Mysql => write!(f, "mysql"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Account mirrored by sync passes; discovered from the credentials when unset
    pub merchant_id: ConfigValue<Option<u64>>,
    pub store_backend: ConfigValue<BackendKind>,
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    pub mysql: MySqlConfig,
    /// Maximum number of offers returned by a listing
    pub list_limit: ConfigValue<u32>,
    /// Catalog base URL, normalized to end with `/`
    pub catalog_endpoint: ConfigValue<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub request_timeout_secs: ConfigValue<u64>,
    /// Port the read server listens on
    pub port: ConfigValue<u16>,
    #[serde(skip_serializing)]
    pub task_token: Option<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal structs for deserializing the config file
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    merchant_id: Option<u64>,
    store: StoreSection,
    catalog: CatalogSection,
    server: ServerSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct StoreSection {
    backend: Option<BackendKind>,
    sqlite_path: Option<PathBuf>,
    mysql: Option<MySqlConfig>,
    list_limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct CatalogSection {
    endpoint: Option<String>,
    access_token: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    port: Option<u16>,
    task_token: Option<String>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading environment variables through `env`.
    pub fn load_with_env<F>(config_path: Option<PathBuf>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merchant_id = ConfigValue::new(None, ConfigSource::Default);
        let mut store_backend = ConfigValue::new(BackendKind::default(), ConfigSource::Default);
        let mut database_path =
            ConfigValue::new(Self::default_data_dir().join("offers.db"), ConfigSource::Default);
        let mut mysql = MySqlConfig::default();
        let mut list_limit = ConfigValue::new(DEFAULT_LIST_LIMIT, ConfigSource::Default);
        let mut catalog_endpoint =
            ConfigValue::new(DEFAULT_ENDPOINT.to_string(), ConfigSource::Default);
        let mut access_token = None;
        let mut request_timeout_secs =
            ConfigValue::new(DEFAULT_TIMEOUT_SECS, ConfigSource::Default);
        let mut port = ConfigValue::new(DEFAULT_PORT, ConfigSource::Default);
        let mut task_token = None;
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(id) = file.merchant_id {
                merchant_id = ConfigValue::new(Some(id), ConfigSource::File);
            }
            if let Some(backend) = file.store.backend {
                store_backend = ConfigValue::new(backend, ConfigSource::File);
            }
            if let Some(db_path) = file.store.sqlite_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(mysql_config) = file.store.mysql {
                mysql = mysql_config;
            }
            if let Some(limit) = file.store.list_limit {
                list_limit = ConfigValue::new(limit, ConfigSource::File);
            }
            if let Some(endpoint) = file.catalog.endpoint {
                catalog_endpoint = ConfigValue::new(endpoint, ConfigSource::File);
            }
            if file.catalog.access_token.is_some() {
                access_token = file.catalog.access_token;
            }
            if let Some(secs) = file.catalog.request_timeout_secs {
                request_timeout_secs = ConfigValue::new(secs, ConfigSource::File);
            }
            if let Some(p) = file.server.port {
                port = ConfigValue::new(p, ConfigSource::File);
            }
            if file.server.task_token.is_some() {
                task_token = file.server.task_token;
            }
        }

        // Apply environment variable overrides
        if let Some((key, raw)) = first_env(&env, &["OFFERS_MERCHANT_ID", "MERCHANT_ID"]) {
            let id = parse_env(key, &raw)?;
            merchant_id = ConfigValue::new(Some(id), ConfigSource::Environment);
        }
        if let Some(db_path) = env("OFFERS_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some((_, endpoint)) = first_env(
            &env,
            &["OFFERS_CATALOG_ENDPOINT", "GOOGLE_SHOPPING_SAMPLES_ENDPOINT"],
        ) {
            catalog_endpoint = ConfigValue::new(endpoint, ConfigSource::Environment);
        }
        if let Some(token) = env("OFFERS_ACCESS_TOKEN") {
            access_token = Some(token);
        }
        if let Some(raw) = env("OFFERS_PORT") {
            port = ConfigValue::new(parse_env("OFFERS_PORT", &raw)?, ConfigSource::Environment);
        }

        catalog_endpoint.value = normalize_endpoint(&catalog_endpoint.value)
            .map_err(|e| ConfigError::InvalidValue {
                key: "catalog.endpoint",
                reason: e.to_string(),
            })?
            .to_string();

        if list_limit.value == 0 {
            return Err(ConfigError::InvalidValue {
                key: "store.list_limit",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            merchant_id,
            store_backend,
            database_path,
            mysql,
            list_limit,
            catalog_endpoint,
            access_token: access_token.filter(|t| !t.is_empty()),
            request_timeout_secs,
            port,
            task_token: task_token.filter(|t| !t.is_empty()),
            config_file,
        })
    }

    /// The store backend selected by `store.backend`, with its parameters.
    pub fn store_backend(&self) -> StoreBackend {
        match self.store_backend.value {
            BackendKind::Sqlite => StoreBackend::Sqlite {
                path: self.database_path.value.clone(),
            },
            BackendKind::Mysql => StoreBackend::MySql(self.mysql.clone()),
            BackendKind::Memory => StoreBackend::Memory,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    /// An HTTP catalog client for the configured endpoint.
    pub fn http_catalog(&self) -> Result<HttpCatalog, CatalogError> {
        HttpCatalog::new(
            &self.catalog_endpoint.value,
            self.access_token.clone(),
            self.request_timeout(),
        )
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/offers/
    /// - macOS: ~/Library/Application Support/offers/
    /// - Windows: %APPDATA%/offers/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offers")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/offers/
    /// - macOS: ~/Library/Application Support/offers/
    /// - Windows: %APPDATA%/offers/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offers")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// The first of `keys` that is set, with the key that matched.
fn first_env<F>(env: &F, keys: &[&'static str]) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|key| env(key).map(|v| (*key, v)))
}

fn parse_env<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            reason: format!("'{raw}': {e}"),
        })
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue { key, reason } => {
                write!(f, "Invalid value for {}: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
