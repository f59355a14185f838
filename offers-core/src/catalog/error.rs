//! Catalog source error types.

use thiserror::Error;

/// Errors talking to the upstream catalog.
///
/// `Api` means the catalog answered with a structured error; `Transport`
/// means no usable answer arrived at all.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog reported an error.
    #[error("Catalog API error {code}: {message}")]
    Api { code: u16, message: String },

    /// Network failure or request deadline exceeded.
    #[error("Catalog transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body did not match the expected resource shape.
    #[error("Failed to decode catalog response: {0}")]
    Decode(String),

    /// The configured endpoint is not an absolute URL.
    #[error("Invalid catalog endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The source handed back the token it was just given.
    #[error("Catalog pagination loop detected at page token '{0}'")]
    PaginationLoop(String),
}

impl CatalogError {
    /// Whether the request timed out rather than failing outright.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CatalogError::Transport(e) if e.is_timeout())
    }
}
