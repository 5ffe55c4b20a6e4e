// src/ingest/fetch.rs
//! One source's feed fetch: URL validation, HTTP GET, tolerant extraction.
//!
//! Failure policy: a misbehaving source contributes nothing and must never
//! abort the batch, so every error path here degrades to an empty record
//! list with a warning.

use async_trait::async_trait;

use crate::ingest::extract::extract_records;
use crate::ingest::types::{FeedSource, RawFeedRecord};

/// Upstreams routinely 403 unknown agents; present a browser.
pub const FEED_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Seam for the aggregation driver: the real fetcher talks HTTP, tests
/// substitute canned or failing doubles.
#[async_trait]
pub trait FetchFeed: Send + Sync {
    /// Fetch and extract one source's feed. Never fails; a source that
    /// cannot be fetched or parsed yields an empty list.
    async fn fetch(&self, source: &FeedSource) -> Vec<RawFeedRecord>;
}

/// Validate that a source URL is http(s) and well-formed before any network
/// access is attempted.
pub fn validate_feed_url(raw: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("invalid url: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchFeed for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Vec<RawFeedRecord> {
        let url = match validate_feed_url(&source.url) {
            Ok(u) => u,
            Err(reason) => {
                tracing::warn!(source = %source.name, url = %source.url, reason = %reason, "skipping source with invalid url");
                metrics::counter!("aggregate_source_errors_total").increment(1);
                return Vec::new();
            }
        };

        tracing::debug!(source = %source.name, url = %url, "fetching feed");

        let response = match self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, FEED_USER_AGENT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(source = %source.name, error = ?e, "feed fetch failed");
                metrics::counter!("aggregate_source_errors_total").increment(1);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                source = %source.name,
                status = response.status().as_u16(),
                "feed fetch returned non-success status"
            );
            metrics::counter!("aggregate_source_errors_total").increment(1);
            return Vec::new();
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(source = %source.name, error = ?e, "reading feed body failed");
                metrics::counter!("aggregate_source_errors_total").increment(1);
                return Vec::new();
            }
        };

        let records = extract_records(&body);
        tracing::debug!(source = %source.name, records = records.len(), "feed extracted");
        records
    }
}
