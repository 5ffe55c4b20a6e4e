// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// One row of the external source table. Administration of these rows
/// (create/update/delete/toggle) belongs to the admin UI + storage service;
/// the pipeline only ever reads the active ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Ephemeral extractor output: one item-like block of a feed document.
/// Consumed immediately into a [`NewsItem`] or discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeedRecord {
    pub title: String,
    pub link: String,
    pub raw_date: Option<String>,
}

/// How the item's zone was established.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrategy {
    /// The raw string carried a parseable offset or GMT/UTC/Z marker.
    Explicit,
    /// The zone was assigned by heuristic (liar list, abbreviation, domain, name).
    Inferred,
}

/// The canonical news unit served to clients. Field names on the wire match
/// the display client's contract, so the serde renames are load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub source: String,
    /// Original raw date string, preserved for audit/display fallback.
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    /// Epoch milliseconds. Kept alongside `timestampUtc` for older clients.
    pub timestamp: i64,
    /// Epoch milliseconds, UTC. Canonical ordering key.
    #[serde(rename = "timestampUtc")]
    pub timestamp_utc: i64,
    /// Human-readable `HH:mm dd/MM`, computed once at ingestion.
    #[serde(rename = "displayTime")]
    pub display_time: String,
    /// IANA zone used to resolve ambiguity, when one applied.
    #[serde(rename = "sourceTimeZone", skip_serializing_if = "Option::is_none")]
    pub source_time_zone: Option<String>,
    #[serde(rename = "parseStrategy")]
    pub parse_strategy: ParseStrategy,
}

impl NewsItem {
    /// Uniqueness key across a result set. Two items sharing a link but
    /// carrying different resolved timestamps are distinct on purpose:
    /// feeds repost with corrected dates.
    pub fn dedup_key(&self) -> (String, i64) {
        (self.link.clone(), self.timestamp_utc)
    }
}

/// Success envelope of the ingestion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsResponse {
    pub items: Vec<NewsItem>,
}
