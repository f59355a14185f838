//! HTTP client for a Content API compatible catalog.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::CatalogError;
use super::types::{Account, AccountIdentifier, AuthInfo, Page, Product};
use super::CatalogSource;

/// Base endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://shopping-content.googleapis.com/content/v2.1/";

/// Per-request deadline used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("offers/", env!("CARGO_PKG_VERSION"));

/// Parses an endpoint override and normalizes it to end with a single `/`.
///
/// Relative paths are joined onto the endpoint, so without the trailing
/// slash the last path segment would be dropped.
pub fn normalize_endpoint(endpoint: &str) -> Result<Url, CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an absolute http(s) URL".to_string()));
    }

    let normalized = format!("{}/", url.as_str().trim_end_matches('/'));
    Url::parse(&normalized).map_err(|e| invalid(e.to_string()))
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

/// Catalog client over HTTP.
///
/// Every request carries the configured timeout; nothing is retried here.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    http: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpCatalog {
    /// Creates a client for `endpoint`.
    ///
    /// `access_token`, when present, is sent as a bearer token. Obtaining it
    /// is the caller's business.
    pub fn new(
        endpoint: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let base_url = normalize_endpoint(endpoint)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(CatalogError::Transport)?;

        Ok(Self {
            http,
            base_url,
            access_token,
        })
    }

    /// Returns the normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, CatalogError> {
        self.base_url
            .join(path)
            .map_err(|e| CatalogError::InvalidEndpoint {
                endpoint: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        page_token: Option<&str>,
    ) -> Result<T, CatalogError> {
        let url = self.url(path)?;
        tracing::debug!(%url, ?page_token, "catalog request");

        let mut request = self.http.get(url);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(CatalogError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(CatalogError::Transport)?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

/// Builds an `Api` error, preferring the structured error envelope.
fn api_error(status: StatusCode, body: &str) -> CatalogError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => CatalogError::Api {
            code: envelope.error.code.unwrap_or_else(|| status.as_u16()),
            message: envelope.error.message,
        },
        Err(_) => {
            let message = match body.trim() {
                "" => status.canonical_reason().unwrap_or("unknown error").to_string(),
                text => text.to_string(),
            };
            CatalogError::Api {
                code: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn authinfo(&self) -> Result<Vec<AccountIdentifier>, CatalogError> {
        let info: AuthInfo = self.get_json("accounts/authinfo", None).await?;
        Ok(info.account_identifiers)
    }

    async fn get_account(
        &self,
        merchant_id: u64,
        account_id: u64,
    ) -> Result<Account, CatalogError> {
        self.get_json(&format!("{merchant_id}/accounts/{account_id}"), None)
            .await
    }

    async fn list_subaccounts(
        &self,
        aggregator_id: u64,
        page_token: Option<&str>,
    ) -> Result<Page<Account>, CatalogError> {
        self.get_json(&format!("{aggregator_id}/accounts"), page_token)
            .await
    }

    async fn list_products(
        &self,
        merchant_id: u64,
        page_token: Option<&str>,
    ) -> Result<Page<Product>, CatalogError> {
        self.get_json(&format!("{merchant_id}/products"), page_token)
            .await
    }
}
