// tests/fetch_isolation.rs
//
// HTTP-level behavior of the real fetcher against a mock upstream: a source
// that errors contributes nothing and never aborts the batch.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use israel_news_aggregator::ingest::fetch::{FetchFeed, HttpFeedFetcher};
use israel_news_aggregator::ingest::{self};
use israel_news_aggregator::sources::SourceStore;
use israel_news_aggregator::{FeedSource, ZoneRules};

struct MockStore {
    sources: Vec<FeedSource>,
}

#[async_trait]
impl SourceStore for MockStore {
    async fn list_active(&self) -> Result<Vec<FeedSource>> {
        Ok(self.sources.clone())
    }
}

fn source(name: &str, url: &str) -> FeedSource {
    FeedSource {
        id: String::new(),
        name: name.to_string(),
        url: url.to_string(),
        active: true,
        created_at: None,
    }
}

fn rss_body(link: &str) -> String {
    let pub_date = (Utc::now() - Duration::hours(1)).to_rfc2822();
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>working item</title>
    <link>{link}</link>
    <pubDate>{pub_date}</pubDate>
  </item>
</channel></rss>"#
    )
}

#[tokio::test]
async fn failing_source_is_isolated_from_healthy_one() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/healthy"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss_body("https://b.example/article"))
                .insert_header("Content-Type", "application/xml"),
        )
        .mount(&server)
        .await;

    let store = MockStore {
        sources: vec![
            source("A", &format!("{}/broken", server.uri())),
            source("B", &format!("{}/healthy", server.uri())),
        ],
    };

    let items = ingest::run_once(
        &store,
        Arc::new(HttpFeedFetcher::new()),
        &ZoneRules::default(),
    )
    .await
    .expect("run must complete despite the broken source");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source, "B");
    assert_eq!(items[0].link, "https://b.example/article");
}

#[tokio::test]
async fn invalid_scheme_source_contributes_nothing() {
    let fetcher = HttpFeedFetcher::new();
    let records = fetcher
        .fetch(&source("bad", "ftp://example.com/feed.xml"))
        .await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn unreachable_host_contributes_nothing() {
    let fetcher = HttpFeedFetcher::new();
    // Reserved port on localhost: connection refused.
    let records = fetcher
        .fetch(&source("down", "http://127.0.0.1:1/feed.xml"))
        .await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn healthy_source_yields_extracted_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(rss_body("https://b.example/only")),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFeedFetcher::new();
    let records = fetcher
        .fetch(&source("B", &format!("{}/feed", server.uri())))
        .await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].link, "https://b.example/only");
}
