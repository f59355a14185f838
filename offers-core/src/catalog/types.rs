//! Resource shapes returned by the upstream catalog.
//!
//! Field names follow the Content API JSON encoding (camelCase). Numeric
//! account IDs are 64-bit and arrive as JSON strings, though plain numbers
//! are accepted too.

use serde::{Deserialize, Deserializer, Serialize};

/// An upstream account: either a standalone merchant or an aggregator of
/// sub-accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(deserialize_with = "u64_from_string_or_number")]
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// One entry of the authenticated identity's accessible accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentifier {
    #[serde(default, deserialize_with = "opt_u64_from_string_or_number")]
    pub aggregator_id: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64_from_string_or_number")]
    pub merchant_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthInfo {
    #[serde(default)]
    pub account_identifiers: Vec<AccountIdentifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub currency: String,
}

/// A product record as listed for a merchant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub price: Option<Price>,
    pub image_link: String,
    pub description: String,
    pub link: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(resources: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            resources,
            next_page_token,
        }
    }

    /// Continuation token for the next request, if there is one.
    ///
    /// An empty token is treated the same as a missing one.
    pub fn next_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

impl StringOrNumber {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            StringOrNumber::Number(n) => Ok(n),
            StringOrNumber::String(s) => s.parse().map_err(E::custom),
        }
    }
}

fn u64_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer)?.into_u64()
}

fn opt_u64_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer)?
        .map(StringOrNumber::into_u64)
        .transpose()
}
