// src/normalize/zones.rs
//! Timezone resolution for raw feed date strings.
//!
//! A feed date either carries an explicit offset (GMT/UTC/Z marker or
//! `±HH:MM`) or it doesn't, and when it doesn't the zone has to be inferred
//! from the string's abbreviation tokens, the item's link host, or the
//! source's display name. One class of source stamps a GMT marker on what is
//! actually Israel wall-clock time; those are forced to Asia/Jerusalem with
//! the marker stripped, and that is the only override of explicit detection.
//!
//! All lookup tables live in [`ZoneRules`] as injectable data, so the policy
//! can be extended or tested without touching control flow.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

pub const ENV_ZONE_RULES_PATH: &str = "ZONE_RULES_PATH";
pub const DEFAULT_ZONE_RULES_PATH: &str = "config/zone_rules.toml";

const JERUSALEM: Tz = chrono_tz::Asia::Jerusalem;
const ATHENS: Tz = chrono_tz::Europe::Athens;

static RE_EXPLICIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bGMT\b|\bUTC\b|\dZ\b|[+-]\d{2}:?\d{2}\b").unwrap());
static RE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:GMT|UTC)\b").unwrap());
static RE_ISO_Z: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)Z\b").unwrap());
static RE_ABBREV_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,5}\b").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lookup tables driving zone resolution. The canonical known-liar list is
/// shared by the server pipeline and the client normalizer, so the correction
/// exists exactly once.
#[derive(Debug, Clone)]
pub struct ZoneRules {
    /// Source-name fragments whose feeds stamp GMT/UTC on Israel wall time.
    pub liar_sources: Vec<String>,
    /// Timezone abbreviation tokens to IANA zones.
    pub abbreviations: HashMap<String, Tz>,
    /// Link-host suffixes of Israeli outlets.
    pub israeli_domains: Vec<String>,
    /// Hebrew/English display-name fragments of known Israeli outlets.
    pub source_fragments: Vec<String>,
}

impl Default for ZoneRules {
    fn default() -> Self {
        let abbreviations = [
            ("IDT", JERUSALEM),
            ("IST", JERUSALEM),
            ("IDST", JERUSALEM),
            ("AST", JERUSALEM),
            ("EET", ATHENS),
            ("EEST", ATHENS),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            liar_sources: vec![
                "ישראל היום".to_string(),
                "וואלה".to_string(),
                "מעריב".to_string(),
            ],
            abbreviations,
            israeli_domains: [
                "ynet.co.il",
                "walla.co.il",
                "israelhayom.co.il",
                "maariv.co.il",
                "inn.co.il",
                "haaretz.co.il",
                "mako.co.il",
                "n12.co.il",
                "now14.co.il",
                "srugim.co.il",
                "kikar.co.il",
                "0404.co.il",
                "jpost.com",
                "timesofisrael.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            source_fragments: [
                "ישראל היום",
                "וואלה",
                "מעריב",
                "ערוץ 7",
                "ערוץ 14",
                "הארץ",
                "כיכר השבת",
                "מקור ראשון",
                "חדשות",
                "ynet",
                "walla",
                "israel hayom",
                "arutz sheva",
                "jerusalem post",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// On-disk shape of the rules file; zones are IANA names parsed on load.
#[derive(Debug, Deserialize)]
struct ZoneRulesFile {
    #[serde(default)]
    liar_sources: Vec<String>,
    #[serde(default)]
    abbreviations: HashMap<String, String>,
    #[serde(default)]
    israeli_domains: Vec<String>,
    #[serde(default)]
    source_fragments: Vec<String>,
}

impl ZoneRules {
    /// Load rules from a TOML file, replacing the compiled-in defaults.
    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading zone rules from {}", path.display()))?;
        let file: ZoneRulesFile =
            toml::from_str(&content).with_context(|| "parsing zone rules toml")?;

        let mut abbreviations = HashMap::with_capacity(file.abbreviations.len());
        for (token, zone) in file.abbreviations {
            let tz = Tz::from_str(&zone)
                .map_err(|_| anyhow!("unknown IANA zone '{zone}' for abbreviation '{token}'"))?;
            abbreviations.insert(token, tz);
        }

        Ok(Self {
            liar_sources: file.liar_sources,
            abbreviations,
            israeli_domains: file.israeli_domains,
            source_fragments: file.source_fragments,
        })
    }

    /// Rules from `$ZONE_RULES_PATH`, then `config/zone_rules.toml`, then the
    /// compiled-in defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_ZONE_RULES_PATH) {
            let pb = std::path::PathBuf::from(p);
            if pb.exists() {
                return Self::from_toml_path(&pb);
            }
            return Err(anyhow!("{ENV_ZONE_RULES_PATH} points to non-existent path"));
        }
        let default = std::path::PathBuf::from(DEFAULT_ZONE_RULES_PATH);
        if default.exists() {
            return Self::from_toml_path(&default);
        }
        Ok(Self::default())
    }

    pub fn is_liar_source(&self, source_name: &str) -> bool {
        let normalized = source_name.trim();
        !normalized.is_empty()
            && self
                .liar_sources
                .iter()
                .any(|liar| normalized.contains(liar.as_str()))
    }
}

/// Outcome of zone resolution for one raw date string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneResolution {
    /// True when the string itself carries a usable offset.
    pub explicit: bool,
    /// Zone to reinterpret wall-clock time in, when one had to be assigned.
    pub zone: Option<Tz>,
    /// The date string after marker/abbreviation stripping, ready to parse.
    pub cleaned: String,
}

impl ZoneResolution {
    pub fn zone_name(&self) -> Option<String> {
        self.zone.map(|tz| tz.name().to_string())
    }
}

fn strip_utc_markers(s: &str) -> String {
    let no_marker = RE_MARKER.replace_all(s, " ");
    let no_z = RE_ISO_Z.replace_all(&no_marker, "$1");
    RE_WS.replace_all(no_z.trim(), " ").to_string()
}

fn link_host(link: &str) -> Option<String> {
    url::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// Resolve the zone situation of one raw date string.
///
/// Order of precedence: known-liar override, explicit offset detection,
/// abbreviation token, link-domain heuristic, source-name heuristic, and
/// finally the Asia/Jerusalem default (the feed set is Israel-centric).
pub fn resolve(raw_date: &str, link: &str, source_name: &str, rules: &ZoneRules) -> ZoneResolution {
    let trimmed = raw_date.trim();

    // Known liars stamp GMT/UTC on local wall time. Strip the marker and
    // force Asia/Jerusalem no matter what the string claims.
    if rules.is_liar_source(source_name) {
        return ZoneResolution {
            explicit: false,
            zone: Some(JERUSALEM),
            cleaned: strip_utc_markers(trimmed),
        };
    }

    if RE_EXPLICIT.is_match(trimmed) {
        return ZoneResolution {
            explicit: true,
            zone: None,
            cleaned: trimmed.to_string(),
        };
    }

    // Abbreviation tokens like "IDT" are parse poison; strip the matched one.
    for token in RE_ABBREV_TOKEN.find_iter(trimmed) {
        if let Some(tz) = rules.abbreviations.get(token.as_str()) {
            let mut cleaned = String::with_capacity(trimmed.len());
            cleaned.push_str(&trimmed[..token.start()]);
            cleaned.push_str(&trimmed[token.end()..]);
            return ZoneResolution {
                explicit: false,
                zone: Some(*tz),
                cleaned: RE_WS.replace_all(cleaned.trim(), " ").to_string(),
            };
        }
    }

    let domain_hit = link_host(link)
        .map(|host| {
            rules
                .israeli_domains
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{d}")))
        })
        .unwrap_or(false);
    let name_hit = !domain_hit && {
        let name = source_name.to_lowercase();
        rules
            .source_fragments
            .iter()
            .any(|frag| name.contains(&frag.to_lowercase()))
    };

    let via = if domain_hit {
        "domain"
    } else if name_hit {
        "source-name"
    } else {
        "default"
    };
    tracing::debug!(source = source_name, via, "zone inferred as Asia/Jerusalem");

    ZoneResolution {
        explicit: false,
        zone: Some(JERUSALEM),
        cleaned: trimmed.to_string(),
    }
}

/// Israel's UTC offset at the given instant, in hours (+2 standard, +3 DST).
pub fn israel_utc_offset_hours(at: DateTime<Utc>) -> i64 {
    let offset = JERUSALEM
        .offset_from_utc_datetime(&at.naive_utc())
        .fix()
        .local_minus_utc();
    i64::from(offset) / 3600
}
