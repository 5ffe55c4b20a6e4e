//! Display-client demo: polls the ingestion endpoint once a minute, runs the
//! client-side normalization pass, keeps a best-effort local cache as a
//! startup placeholder, and prints the feed to stdout.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use chrono_tz::Asia::Jerusalem;

use israel_news_aggregator::client::{
    normalized_display_time, persist_news_cache, prepare_news_items, read_cached_news,
    FetchNewsResponse, WireNewsItem, DEFAULT_FEED_CACHE_PATH, ENV_FEED_CACHE_PATH,
};
use israel_news_aggregator::normalize::zones::ZoneRules;
use israel_news_aggregator::NewsItem;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/fetch-news";
const REFRESH_SECS: u64 = 60;

async fn fetch_latest(client: &reqwest::Client, endpoint: &str) -> Result<Vec<WireNewsItem>> {
    let response = client
        .post(endpoint)
        .send()
        .await
        .context("calling fetch-news")?;
    if !response.status().is_success() {
        bail!("fetch-news returned status {}", response.status());
    }
    let payload: FetchNewsResponse = response.json().await.context("decoding news payload")?;
    Ok(payload.items.unwrap_or_default())
}

fn render(items: &[NewsItem], rules: &ZoneRules, from_cache: bool) {
    let stamp = Utc::now().with_timezone(&Jerusalem).format("%H:%M %d/%m");
    let suffix = if from_cache { " (מהמטמון)" } else { "" };
    println!("עדכון אחרון: {stamp}{suffix}");
    for item in items {
        println!(
            "[{}] {:<14} | {}",
            normalized_display_time(item, rules),
            item.source,
            item.title
        );
    }
    println!();
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    let _ = dotenvy::dotenv();

    let endpoint =
        std::env::var("NEWS_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let cache_path = PathBuf::from(
        std::env::var(ENV_FEED_CACHE_PATH).unwrap_or_else(|_| DEFAULT_FEED_CACHE_PATH.to_string()),
    );
    let rules = ZoneRules::load_default().unwrap_or_else(|e| {
        tracing::warn!(error = ?e, "zone rules failed to load, using defaults");
        ZoneRules::default()
    });

    // Loading placeholder: last successful batch, if one survives on disk.
    if let Some(cached) = read_cached_news(&cache_path) {
        render(&cached.items, &rules, true);
    }

    let client = reqwest::Client::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(REFRESH_SECS));
    loop {
        ticker.tick().await;
        match fetch_latest(&client, &endpoint).await {
            Ok(items) => {
                let now_ms = Utc::now().timestamp_millis();
                let prepared = prepare_news_items(items, now_ms, &rules);
                persist_news_cache(&cache_path, &prepared, now_ms);
                render(&prepared, &rules, false);
            }
            Err(e) => {
                // Keep showing whatever rendered last; the next tick retries.
                tracing::warn!(error = ?e, "לא הצלחנו לטעון את החדשות");
            }
        }
    }
}
