// src/client.rs
//! Display-side normalization of the server's news payload.
//!
//! The display layer re-derives timestamps and re-applies the known-liar
//! correction on its own: defense in depth for payloads produced by an older
//! server that never corrected them. The liar list itself is shared with the
//! server pipeline ([`ZoneRules`]), so the correction policy exists once.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::{NewsItem, ParseStrategy};
use crate::ingest::verify_sort_invariant;
use crate::normalize::dates::{extract_display_from_raw, format_display_time};
use crate::normalize::zones::{israel_utc_offset_hours, ZoneRules};

pub const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub const ENV_FEED_CACHE_PATH: &str = "FEED_CACHE_PATH";
pub const DEFAULT_FEED_CACHE_PATH: &str = ".feed_watch_cache.json";

/// Server payload item as the client reads it: every numeric field optional,
/// because the payload may come from an older server revision.
#[derive(Debug, Clone, Deserialize)]
pub struct WireNewsItem {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub source: String,
    #[serde(rename = "pubDate", default)]
    pub pub_date: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(rename = "timestampUtc", default)]
    pub timestamp_utc: Option<i64>,
    #[serde(rename = "displayTime", default)]
    pub display_time: Option<String>,
    #[serde(rename = "sourceTimeZone", default)]
    pub source_time_zone: Option<String>,
    #[serde(rename = "parseStrategy", default)]
    pub parse_strategy: Option<ParseStrategy>,
}

/// Client-side view of the endpoint envelope; tolerates an absent `items`.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchNewsResponse {
    #[serde(default)]
    pub items: Option<Vec<WireNewsItem>>,
}

/// Best-effort local cache, overwritten wholesale after every successful
/// fetch and read once at startup as a loading placeholder. Never
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedNewsPayload {
    pub timestamp: i64,
    pub items: Vec<NewsItem>,
}

fn parse_pub_date_ms(value: &str) -> Option<i64> {
    if value.trim().is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Canonical timestamp preference: server UTC value, then the generic
/// timestamp, then a raw parse of the original date string.
pub fn resolve_timestamp(item: &WireNewsItem) -> Option<i64> {
    item.timestamp_utc
        .or(item.timestamp)
        .or_else(|| parse_pub_date_ms(&item.pub_date))
}

/// Shift a known-liar timestamp back by Israel's UTC offset at that instant
/// (+2 standard, +3 DST). These sources report Israel wall time stamped as
/// UTC.
pub fn apply_timezone_fix(timestamp: i64, source: &str, rules: &ZoneRules) -> i64 {
    if !rules.is_liar_source(source) {
        return timestamp;
    }
    let at = Utc
        .timestamp_millis_opt(timestamp)
        .single()
        .unwrap_or_else(Utc::now);
    let offset_hours = israel_utc_offset_hours(at);
    timestamp - offset_hours * 60 * 60 * 1000
}

/// Normalize a raw server payload into the display list: correct, drop
/// undatable items, filter to the trailing 24 hours, dedup on
/// `(link, timestamp)`, sort newest-first, and self-check the order.
pub fn prepare_news_items(
    items: Vec<WireNewsItem>,
    now_ms: i64,
    rules: &ZoneRules,
) -> Vec<NewsItem> {
    let one_day_ago = now_ms - ONE_DAY_MS;

    let normalized = items.into_iter().filter_map(|wire| {
        let raw_ts = resolve_timestamp(&wire)?;
        let timestamp = apply_timezone_fix(raw_ts, &wire.source, rules);
        Some(NewsItem {
            title: wire.title,
            link: wire.link,
            source: wire.source,
            pub_date: wire.pub_date,
            timestamp,
            timestamp_utc: wire.timestamp_utc.unwrap_or(timestamp),
            display_time: wire.display_time.unwrap_or_default(),
            source_time_zone: wire.source_time_zone,
            parse_strategy: wire.parse_strategy.unwrap_or(ParseStrategy::Inferred),
        })
    });

    let mut seen = std::collections::HashSet::new();
    let mut prepared: Vec<NewsItem> = normalized
        .filter(|item| item.timestamp >= one_day_ago)
        .filter(|item| seen.insert((item.link.clone(), item.timestamp)))
        .collect();

    prepared.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    verify_sort_invariant(&prepared);
    prepared
}

/// Human display string for one prepared item.
///
/// Prefers the server's own `displayTime` (it already did the raw-string
/// extraction) except for known liars, whose server value may encode the
/// uncorrected wall time; those are reformatted from the corrected
/// timestamp. Then falls back through raw extraction and a raw parse.
pub fn normalized_display_time(item: &NewsItem, rules: &ZoneRules) -> String {
    let server_value = item.display_time.trim();
    if !server_value.is_empty() && !rules.is_liar_source(&item.source) {
        return server_value.to_string();
    }

    if let Some(formatted) = format_display_time(item.timestamp, chrono_tz::Asia::Jerusalem) {
        return formatted;
    }

    if let Some(extracted) = extract_display_from_raw(&item.pub_date) {
        return extracted;
    }

    parse_pub_date_ms(&item.pub_date)
        .and_then(|ts| format_display_time(ts, chrono_tz::Asia::Jerusalem))
        .unwrap_or_default()
}

/// Read the cache file; anything malformed reads as absent.
pub fn read_cached_news(path: &Path) -> Option<CachedNewsPayload> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<CachedNewsPayload>(&content) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!(error = ?e, "failed to parse cached news payload");
            None
        }
    }
}

/// Overwrite the cache wholesale. Failures are logged and swallowed; the
/// cache is a nicety, not a dependency.
pub fn persist_news_cache(path: &Path, items: &[NewsItem], now_ms: i64) {
    let payload = CachedNewsPayload {
        timestamp: now_ms,
        items: items.to_vec(),
    };
    match serde_json::to_string(&payload) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                tracing::warn!(error = ?e, path = %path.display(), "failed to persist news cache");
            }
        }
        Err(e) => {
            tracing::warn!(error = ?e, "failed to serialize news cache");
        }
    }
}
