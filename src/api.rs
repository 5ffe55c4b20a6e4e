use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::ingest;
use crate::ingest::fetch::FetchFeed;
use crate::ingest::types::NewsResponse;
use crate::normalize::zones::ZoneRules;
use crate::sources::SourceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SourceStore>,
    pub fetcher: Arc<dyn FetchFeed>,
    pub rules: Arc<ZoneRules>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SourceStore>,
        fetcher: Arc<dyn FetchFeed>,
        rules: ZoneRules,
    ) -> Self {
        Self {
            store,
            fetcher,
            rules: Arc::new(rules),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/fetch-news", post(fetch_news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// The ingestion trigger: one aggregation pass over all active sources.
///
/// Per-source and per-item failures are absorbed inside the pipeline; the
/// only error that surfaces here is a failing source listing.
async fn fetch_news(State(state): State<AppState>) -> Response {
    match ingest::run_once(state.store.as_ref(), state.fetcher.clone(), &state.rules).await {
        Ok(items) => (StatusCode::OK, Json(NewsResponse { items })).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "aggregation run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
