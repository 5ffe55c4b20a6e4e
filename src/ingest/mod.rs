// src/ingest/mod.rs
pub mod config;
pub mod extract;
pub mod fetch;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::ingest::fetch::FetchFeed;
use crate::ingest::types::{FeedSource, NewsItem, RawFeedRecord};
use crate::normalize::dates::parse_news_date;
use crate::normalize::zones::{resolve, ZoneRules};
use crate::sources::SourceStore;

/// At most this many feed fetches in flight at once. Caps outbound
/// connections and keeps latency bounded regardless of source count.
pub const MAX_CONCURRENT_FETCHES: usize = 5;

/// Items older than this at aggregation time are dropped.
pub const FRESHNESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_items_total",
            "Raw records extracted from feed documents."
        );
        describe_counter!(
            "aggregate_kept_total",
            "Items kept after freshness + dedup."
        );
        describe_counter!(
            "aggregate_stale_total",
            "Items dropped by the 24h freshness window."
        );
        describe_counter!(
            "aggregate_dedup_total",
            "Items removed as (link, timestamp) duplicates."
        );
        describe_counter!(
            "aggregate_unparsed_dates_total",
            "Items skipped because no date strategy produced a valid result."
        );
        describe_counter!(
            "aggregate_source_errors_total",
            "Sources skipped due to invalid urls or fetch failures."
        );
        describe_histogram!(
            "aggregate_fetch_ms",
            "Per-source fetch+parse time in milliseconds."
        );
        describe_gauge!(
            "aggregate_last_run_ts",
            "Unix ts when the aggregation pipeline last ran."
        );
    });
}

/// Short stable id for an item link, for log lines.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Turn one extracted record into a [`NewsItem`], resolving its zone and
/// parsing its date. `None` when the record has no usable date (skipped,
/// logged upstream of the freshness filter).
pub fn build_news_item(
    record: RawFeedRecord,
    source_name: &str,
    rules: &ZoneRules,
    now: DateTime<Utc>,
) -> Option<NewsItem> {
    let Some(raw_date) = record.raw_date.as_deref() else {
        tracing::debug!(
            source = source_name,
            item = %anon_hash(&record.link),
            "record carries no date tag; skipped"
        );
        return None;
    };

    let resolution = resolve(raw_date, &record.link, source_name, rules);
    let Some(parsed) = parse_news_date(raw_date, &resolution, now) else {
        tracing::warn!(
            source = source_name,
            item = %anon_hash(&record.link),
            raw_date,
            "unparseable item date; skipped"
        );
        counter!("aggregate_unparsed_dates_total").increment(1);
        return None;
    };

    Some(NewsItem {
        title: record.title,
        link: record.link,
        source: source_name.to_string(),
        pub_date: raw_date.to_string(),
        timestamp: parsed.timestamp_utc,
        timestamp_utc: parsed.timestamp_utc,
        display_time: parsed.display_time,
        source_time_zone: resolution.zone_name(),
        parse_strategy: parsed.strategy,
    })
}

/// Freshness-filter, dedup on `(link, timestamp)`, and sort descending.
/// Returns (kept, stale_count, dedup_count).
pub fn freshness_dedup_sort(
    now_ms: i64,
    items: Vec<NewsItem>,
) -> (Vec<NewsItem>, usize, usize) {
    let cutoff = now_ms - FRESHNESS_WINDOW_MS;

    let mut stale = 0usize;
    let mut dedup = 0usize;
    let mut seen: HashSet<(String, i64)> = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        if item.timestamp_utc < cutoff {
            stale += 1;
            continue;
        }
        if !seen.insert(item.dedup_key()) {
            dedup += 1;
            continue;
        }
        kept.push(item);
    }

    kept.sort_by(|a, b| b.timestamp_utc.cmp(&a.timestamp_utc));
    (kept, stale, dedup)
}

/// Post-sort integrity scan: the sort is authoritative, so an inversion here
/// is a self-check failure worth a warning, never a repair.
pub fn verify_sort_invariant(items: &[NewsItem]) {
    for pair in items.windows(2) {
        if pair[0].timestamp_utc < pair[1].timestamp_utc {
            tracing::warn!(
                first = %anon_hash(&pair[0].link),
                second = %anon_hash(&pair[1].link),
                "detected unsorted segment after authoritative sort"
            );
            break;
        }
    }
}

/// Run one full aggregation pass over the store's active sources.
///
/// Fetch failures are absorbed per source; only a failing source listing
/// escapes as an error. Completion order of fetches is non-deterministic,
/// the final sort makes output order deterministic anyway.
pub async fn run_once(
    store: &dyn SourceStore,
    fetcher: Arc<dyn FetchFeed>,
    rules: &ZoneRules,
) -> Result<Vec<NewsItem>> {
    ensure_metrics_described();

    let sources = store.list_active().await?;
    let now = Utc::now();
    tracing::info!(sources = sources.len(), "aggregation run started");

    let per_source: Vec<Vec<NewsItem>> = stream::iter(sources.into_iter())
        .map(|source: FeedSource| {
            let fetcher = fetcher.clone();
            let rules = rules.clone();
            async move {
                let t0 = std::time::Instant::now();
                let records = fetcher.fetch(&source).await;
                counter!("aggregate_items_total").increment(records.len() as u64);

                let items: Vec<NewsItem> = records
                    .into_iter()
                    .filter_map(|r| build_news_item(r, &source.name, &rules, now))
                    .collect();

                histogram!("aggregate_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                tracing::debug!(source = %source.name, items = items.len(), "source aggregated");
                items
            }
        })
        .buffer_unordered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await;

    let merged: Vec<NewsItem> = per_source.into_iter().flatten().collect();
    let (kept, stale, dedup) = freshness_dedup_sort(now.timestamp_millis(), merged);
    verify_sort_invariant(&kept);

    counter!("aggregate_kept_total").increment(kept.len() as u64);
    counter!("aggregate_stale_total").increment(stale as u64);
    counter!("aggregate_dedup_total").increment(dedup as u64);
    gauge!("aggregate_last_run_ts").set(now.timestamp() as f64);

    tracing::info!(
        kept = kept.len(),
        stale,
        dedup,
        "aggregation run finished"
    );
    Ok(kept)
}
