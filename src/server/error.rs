use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use offers_core::{StoreError, SyncError};

/// Error body returned by every failing route
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// A request failure with the status it maps to.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let (status, error) = match &e {
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            StoreError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            e if e.is_unavailable() => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };
        Self::new(status, error, e.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Store(e) => e.into(),
            SyncError::Catalog(e) => {
                Self::new(StatusCode::BAD_GATEWAY, "upstream_error", e.to_string())
            }
            SyncError::Config(message) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "config_error", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, error = self.error, "{}", self.message);
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.error,
                message: self.message,
            }),
        )
            .into_response()
    }
}
