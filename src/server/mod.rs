//! Read server for the offer mirror.
//!
//! # Endpoints
//!
//! - `GET /`: Redirects to `/offers`
//! - `GET /offers`: Bounded listing of stored offers
//! - `GET /offers/{offer_id}`: One offer, or 404
//! - `GET /search?q=`: Offers whose description contains `q`
//! - `GET /tasks/update_db`: Runs one sync pass (bearer token when `task_token` is set)
//! - `GET /health`: Health check endpoint (no auth required)

mod error;
mod handlers;

pub use error::ApiError;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use offers_core::{OfferStore, SyncDriver};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn OfferStore>,
    driver: SyncDriver,
    merchant_id: Option<u64>,
    task_token: Option<Arc<str>>,
    /// Held for the duration of a sync pass
    sync_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<dyn OfferStore>, driver: SyncDriver, merchant_id: Option<u64>) -> Self {
        Self {
            store,
            driver,
            merchant_id,
            task_token: None,
            sync_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Requires `Authorization: Bearer <token>` on task routes.
    pub fn with_task_token(mut self, token: Option<String>) -> Self {
        self.task_token = token.map(Arc::from);
        self
    }
}

/// Builds the router with tracing applied to every route.
pub fn router(state: AppState) -> Router {
    let task_routes = Router::new()
        .route("/tasks/update_db", get(handlers::update_db))
        .layer(middleware::from_fn_with_state(state.clone(), task_auth));

    Router::new()
        .route("/", get(handlers::index))
        .route("/offers", get(handlers::list_offers))
        .route("/offers/{offer_id}", get(handlers::get_offer))
        .route("/search", get(handlers::search_offers))
        .route("/health", get(handlers::health))
        .merge(task_routes)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Task authentication middleware. A no-op when no token is configured.
async fn task_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.task_token.as_deref() else {
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => ApiError::new(StatusCode::UNAUTHORIZED, "invalid_token", "Invalid task token")
            .into_response(),
        None => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "missing_auth",
            "Authorization header with Bearer scheme required",
        )
        .into_response(),
    }
}
