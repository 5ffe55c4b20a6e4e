// src/sources.rs
//! The source collaborator: a read-only list of feed sources owned by the
//! external storage service. The pipeline only ever asks for active rows;
//! create/update/delete/toggle live in the admin surface, out of scope here.
//!
//! A failing source listing is the single error that propagates out of an
//! aggregation run (it becomes the endpoint's 500).

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ingest::config::{load_sources_default, load_sources_from};
use crate::ingest::types::FeedSource;

pub const ENV_SOURCES_API_URL: &str = "SOURCES_API_URL";
pub const ENV_SOURCES_API_KEY: &str = "SOURCES_API_KEY";

#[async_trait]
pub trait SourceStore: Send + Sync {
    /// All sources currently flagged active.
    async fn list_active(&self) -> Result<Vec<FeedSource>>;
}

/// Storage-service REST store. Speaks the collaborator's row-filter protocol:
/// `GET {base}/rest/v1/rss_sources?active=eq.true` with api-key headers.
pub struct RestSourceStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RestSourceStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/rss_sources?active=eq.true&select=*", self.base_url)
    }
}

#[async_trait]
impl SourceStore for RestSourceStore {
    async fn list_active(&self) -> Result<Vec<FeedSource>> {
        let response = self
            .client
            .get(self.endpoint())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("querying source store")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("source store returned status {status}");
        }

        let rows: Vec<FeedSource> = response
            .json()
            .await
            .context("decoding source store rows")?;

        // The filter runs server-side, but rows are re-checked anyway; an
        // out-of-date collaborator must not sneak disabled sources in.
        Ok(rows.into_iter().filter(|s| s.active).collect())
    }
}

/// Local-file store for development and tests; same row shape, TOML or JSON.
pub struct FileSourceStore {
    path: Option<PathBuf>,
}

impl FileSourceStore {
    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Resolve the path via `$FEED_SOURCES_PATH` / `config/feed_sources.*`
    /// at list time.
    pub fn from_default_locations() -> Self {
        Self { path: None }
    }
}

#[async_trait]
impl SourceStore for FileSourceStore {
    async fn list_active(&self) -> Result<Vec<FeedSource>> {
        let sources = match &self.path {
            Some(p) => load_sources_from(p)?,
            None => load_sources_default()?,
        };
        Ok(sources.into_iter().filter(|s| s.active).collect())
    }
}

/// Pick a store from the environment: the REST collaborator when its URL and
/// key are configured, the local file store otherwise.
pub fn source_store_from_env() -> Arc<dyn SourceStore> {
    match (
        std::env::var(ENV_SOURCES_API_URL),
        std::env::var(ENV_SOURCES_API_KEY),
    ) {
        (Ok(url), Ok(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
            tracing::info!("using REST source store");
            Arc::new(RestSourceStore::new(url, key))
        }
        _ => {
            tracing::info!("using file source store");
            Arc::new(FileSourceStore::from_default_locations())
        }
    }
}
