use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};

use offers_core::{Offer, SyncReport};

use super::{ApiError, AppState};

/// Health check response
#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    q: Option<String>,
}

pub(super) async fn index() -> Redirect {
    Redirect::to("/offers")
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(super) async fn list_offers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Offer>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

pub(super) async fn get_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> Result<Json<Offer>, ApiError> {
    Ok(Json(state.store.get(&offer_id).await?))
}

pub(super) async fn search_offers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Offer>>, ApiError> {
    let query = params.q.filter(|q| !q.is_empty()).ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "missing_query",
            "Query parameter 'q' is required",
        )
    })?;

    Ok(Json(state.store.search(&query).await?))
}

/// Runs one sync pass for the configured merchant.
///
/// Only one pass runs at a time; a request arriving mid-pass is rejected
/// rather than queued. The pass runs on its own task and holds the lock
/// until it finishes, even if the client disconnects first.
pub(super) async fn update_db(
    State(state): State<AppState>,
) -> Result<Json<SyncReport>, ApiError> {
    let merchant_id = state.merchant_id.ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "config_error",
            "No merchant ID configured; set OFFERS_MERCHANT_ID",
        )
    })?;

    let Ok(guard) = state.sync_lock.clone().try_lock_owned() else {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "sync_in_progress",
            "A sync pass is already running",
        ));
    };

    tracing::info!(merchant_id, "Sync pass requested");
    let driver = state.driver.clone();
    let pass = tokio::spawn(async move {
        let _guard = guard;
        driver.run(Some(merchant_id)).await
    });

    let report = pass.await.map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "sync_task_failed",
            e.to_string(),
        )
    })??;
    Ok(Json(report))
}
