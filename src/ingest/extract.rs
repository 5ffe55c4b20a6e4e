// src/ingest/extract.rs
//! Tolerant, regex-based extraction of item-like records from feed documents.
//!
//! Upstream publishers ship inconsistently well-formed XML, so scanning by
//! tag name beats strict parsing here: a malformed sibling block must never
//! take down the rest of the document. Three shapes are scanned independently
//! within one document: RSS `<item>`, Atom `<entry>`, and sitemap `<url>`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::RawFeedRecord;

/// Date-ish tags per block shape, in priority order.
const RSS_DATE_TAGS: &[&str] = &["pubDate", "dc:date", "date", "lastBuildDate"];
const ATOM_DATE_TAGS: &[&str] = &["published", "updated"];
const SITEMAP_DATE_TAGS: &[&str] = &["news:publication_date", "lastmod"];
const SITEMAP_TITLE_TAGS: &[&str] = &["news:title", "title"];

static RE_RSS_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item[^>]*>(.*?)</item>").unwrap());
static RE_ATOM_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<entry[^>]*>(.*?)</entry>").unwrap());
static RE_SITEMAP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<url[^>]*>(.*?)</url>").unwrap());

static RE_CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());

static RE_ATOM_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b[^>]*/?>").unwrap());
static RE_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref\s*=\s*["']([^"']+)["']"#).unwrap());
static RE_REL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\brel\s*=\s*["']([^"']+)["']"#).unwrap());

/// Every tag the extractor ever asks for, compiled once.
static TAG_REGEXES: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    let tags = [
        "title",
        "link",
        "loc",
        "pubDate",
        "dc:date",
        "date",
        "lastBuildDate",
        "published",
        "updated",
        "news:publication_date",
        "news:title",
        "lastmod",
    ];
    tags.iter()
        .map(|t| (*t, inner_text_regex(t)))
        .collect()
});

fn inner_text_regex(tag: &str) -> Regex {
    // `:` needs no escaping; tag names here are all [A-Za-z:] only.
    Regex::new(&format!(r"(?is)<{tag}[^>]*>(.*?)</{tag}>")).unwrap()
}

/// Inner text of the first matching tag from `tags` (priority order),
/// CDATA-unwrapped and trimmed. `None` when no tag matches or the match
/// is empty after trimming.
pub fn first_tag_text(block: &str, tags: &[&str]) -> Option<String> {
    for tag in tags {
        let re = TAG_REGEXES
            .get(tag)
            .cloned()
            .unwrap_or_else(|| inner_text_regex(tag));
        if let Some(caps) = re.captures(block) {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let unwrapped = RE_CDATA.replace_all(raw, "$1");
            let trimmed = unwrapped.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Decode XML entities, reversing double-escaping first: feeds commonly ship
/// `&amp;quot;` where they meant `&quot;`, so one decode pass is run on top
/// of another. CDATA wrappers are unwrapped before decoding.
pub fn decode_entities(s: &str) -> String {
    let unwrapped = RE_CDATA.replace_all(s, "$1");
    let once = html_escape::decode_html_entities(unwrapped.as_ref()).to_string();
    html_escape::decode_html_entities(&once).trim().to_string()
}

/// Atom `<entry>` links live in attributes: prefer `rel="alternate"`,
/// fall back to the first `href` found when no such relation is present.
fn atom_entry_link(block: &str) -> Option<String> {
    let mut first_href: Option<String> = None;
    for link_tag in RE_ATOM_LINK.find_iter(block) {
        let tag = link_tag.as_str();
        let href = RE_HREF
            .captures(tag)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());
        let Some(href) = href.filter(|h| !h.is_empty()) else {
            continue;
        };
        let rel = RE_REL
            .captures(tag)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase());
        match rel.as_deref() {
            Some("alternate") => return Some(href),
            _ => {
                if first_href.is_none() {
                    first_href = Some(href);
                }
            }
        }
    }
    first_href
}

fn rss_records(document: &str, out: &mut Vec<RawFeedRecord>) {
    for caps in RE_RSS_ITEM.captures_iter(document) {
        let block = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let title = first_tag_text(block, &["title"]).map(|t| decode_entities(&t));
        let link = first_tag_text(block, &["link"]);
        push_record(out, title, link, first_tag_text(block, RSS_DATE_TAGS));
    }
}

fn atom_records(document: &str, out: &mut Vec<RawFeedRecord>) {
    for caps in RE_ATOM_ENTRY.captures_iter(document) {
        let block = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let title = first_tag_text(block, &["title"]).map(|t| decode_entities(&t));
        let link = atom_entry_link(block);
        push_record(out, title, link, first_tag_text(block, ATOM_DATE_TAGS));
    }
}

fn sitemap_records(document: &str, out: &mut Vec<RawFeedRecord>) {
    for caps in RE_SITEMAP_URL.captures_iter(document) {
        let block = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let title = first_tag_text(block, SITEMAP_TITLE_TAGS).map(|t| decode_entities(&t));
        let link = first_tag_text(block, &["loc"]);
        push_record(out, title, link, first_tag_text(block, SITEMAP_DATE_TAGS));
    }
}

/// A block missing a required field (title or link) is skipped, not reported.
fn push_record(
    out: &mut Vec<RawFeedRecord>,
    title: Option<String>,
    link: Option<String>,
    raw_date: Option<String>,
) {
    if let (Some(title), Some(link)) = (title, link) {
        if !title.is_empty() && !link.is_empty() {
            out.push(RawFeedRecord {
                title,
                link,
                raw_date,
            });
        }
    }
}

/// Extract all item-like records from a raw feed document. Pure; never fails.
/// An unrecognized document simply yields no records.
pub fn extract_records(document: &str) -> Vec<RawFeedRecord> {
    let mut out = Vec::new();
    rss_records(document, &mut out);
    atom_records(document, &mut out);
    sitemap_records(document, &mut out);
    out
}
