//! News Aggregation Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use israel_news_aggregator::api::{self, AppState};
use israel_news_aggregator::ingest::fetch::HttpFeedFetcher;
use israel_news_aggregator::metrics::Metrics;
use israel_news_aggregator::normalize::zones::ZoneRules;
use israel_news_aggregator::sources::source_store_from_env;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - NEWS_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("NEWS_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("israel_news_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables SOURCES_API_URL / ZONE_RULES_PATH / FEED_SOURCES_PATH
    // from .env so the stores and resolver can pick them up.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let rules = ZoneRules::load_default().expect("Failed to load zone rules");

    let metrics = Metrics::init();

    let state = AppState::new(
        source_store_from_env(),
        Arc::new(HttpFeedFetcher::new()),
        rules,
    );
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
