// src/normalize/dates.rs
//! Ordered fallback chain turning raw feed date strings into UTC epoch
//! milliseconds, plus the human display string derivation.
//!
//! The chain is an explicit list of (name, strategy) pairs, iterated until
//! the first structurally valid result. There is no scoring between
//! candidates: first valid wins. Wall-clock results are reinterpreted in the
//! resolved hint zone (offset reassigned, wall time preserved) when the
//! string itself carried no offset.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use crate::ingest::types::ParseStrategy;
use crate::normalize::zones::ZoneResolution;

/// Inferred-zone timestamps may land at most this far in the future;
/// anything beyond is clamped. Explicit offsets are trusted as-is.
pub const MAX_FUTURE_DRIFT_MS: i64 = 10 * 60 * 1000;

/// Wall-vs-resolved divergence (minutes) worth flagging as feed misbehavior.
const DEVIATION_WARN_MINUTES: i64 = 180;

const JERUSALEM: Tz = chrono_tz::Asia::Jerusalem;

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static RE_DISPLAY_RFC2822: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{4})\s+(\d{1,2}):(\d{2})(?::\d{2})?",
    )
    .unwrap()
});
static RE_DISPLAY_ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})[T\s]+(\d{1,2}):(\d{2})").unwrap());

/// A fully resolved publication instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDate {
    /// Epoch milliseconds, UTC.
    pub timestamp_utc: i64,
    /// `HH:mm dd/MM`, preferring the source's own printed wall time.
    pub display_time: String,
    pub strategy: ParseStrategy,
    /// Zone used for reinterpretation, when one applied.
    pub zone: Option<Tz>,
}

/// Raw outcome of one parse strategy.
#[derive(Debug, Clone, Copy)]
enum Parsed {
    /// The string carried its own offset; `wall` keeps the printed local
    /// fields for the deviation self-check.
    Absolute { ts_ms: i64, wall: NaiveDateTime },
    /// Offset-less wall-clock time, zone to be assigned by the caller.
    Wall(NaiveDateTime),
}

type Strategy = fn(&str) -> Option<Parsed>;

/// The chain, in order. First structurally valid result wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("rfc2822", parse_rfc2822_time),
    ("rfc2822-lenient", parse_rfc2822_chrono),
    ("iso8601", parse_rfc3339),
    ("forced-gmt", parse_forced_gmt),
    ("naive-rfc2822", parse_naive_rfc2822),
    ("day-month-year", parse_day_month_year),
    ("generic", parse_generic),
];

fn chrono_wall_of(odt: &OffsetDateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(odt.year(), u8::from(odt.month()) as u32, odt.day() as u32)?
        .and_hms_opt(odt.hour() as u32, odt.minute() as u32, odt.second() as u32)
}

/// Strict RFC-2822 via the `time` crate (also covers HTTP-date).
fn parse_rfc2822_time(s: &str) -> Option<Parsed> {
    let odt = OffsetDateTime::parse(s, &Rfc2822).ok()?;
    Some(Parsed::Absolute {
        ts_ms: (odt.unix_timestamp_nanos() / 1_000_000) as i64,
        wall: chrono_wall_of(&odt)?,
    })
}

/// Chrono's RFC-2822 reader accepts obsolete zone names (GMT, UT, EST…)
/// that the strict parser rejects.
fn parse_rfc2822_chrono(s: &str) -> Option<Parsed> {
    let dt = DateTime::parse_from_rfc2822(s).ok()?;
    Some(Parsed::Absolute {
        ts_ms: dt.timestamp_millis(),
        wall: dt.naive_local(),
    })
}

fn parse_rfc3339(s: &str) -> Option<Parsed> {
    let dt = DateTime::parse_from_rfc3339(s).ok()?;
    Some(Parsed::Absolute {
        ts_ms: dt.timestamp_millis(),
        wall: dt.naive_local(),
    })
}

/// RFC-2822-shaped dates carrying a literal `GMT` tail, forced to UTC.
fn parse_forced_gmt(s: &str) -> Option<Parsed> {
    let naive = NaiveDateTime::parse_from_str(s, "%a, %d %b %Y %H:%M:%S GMT").ok()?;
    Some(Parsed::Absolute {
        ts_ms: naive.and_utc().timestamp_millis(),
        wall: naive,
    })
}

fn parse_naive_rfc2822(s: &str) -> Option<Parsed> {
    const FORMATS: &[&str] = &[
        "%a, %d %b %Y %H:%M:%S",
        "%a, %d %b %Y %H:%M",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(Parsed::Wall)
}

fn parse_day_month_year(s: &str) -> Option<Parsed> {
    const FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(Parsed::Wall)
}

/// Permissive catch-all: offset-less ISO variants and bare dates.
fn parse_generic(s: &str) -> Option<Parsed> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    if let Some(naive) = FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(Parsed::Wall(naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Parsed::Wall)
}

fn candidate_variants(cleaned: &str) -> Vec<String> {
    let trimmed = cleaned.trim().to_string();
    let collapsed = RE_WS.replace_all(&trimmed, " ").to_string();
    if collapsed == trimmed {
        vec![trimmed]
    } else {
        vec![trimmed, collapsed]
    }
}

/// Reinterpret a wall-clock time in `tz`: same printed fields, new offset.
/// DST-ambiguous times take the earliest candidate; nonexistent times (the
/// spring-forward gap) fall back to the UTC reading.
fn wall_in_zone_ms(naive: NaiveDateTime, tz: Tz) -> i64 {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// Extract `HH:mm dd/MM` straight from the raw string, so the displayed time
/// matches exactly what the source printed, sidestepping zone math entirely.
pub fn extract_display_from_raw(raw: &str) -> Option<String> {
    if let Some(caps) = RE_DISPLAY_RFC2822.captures(raw) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let hours: u32 = caps[4].parse().ok()?;
        let minutes = &caps[5];
        return Some(format!("{hours:02}:{minutes} {day:02}/{month:02}"));
    }
    if let Some(caps) = RE_DISPLAY_ISO.captures(raw) {
        let month = &caps[2];
        let day = &caps[3];
        let hours: u32 = caps[4].parse().ok()?;
        let minutes = &caps[5];
        return Some(format!("{hours:02}:{minutes} {day}/{month}"));
    }
    None
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: &[&str] = &[
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_ascii_lowercase();
    MONTHS.iter().position(|m| *m == lower).map(|i| i as u32 + 1)
}

/// Format an instant as `HH:mm dd/MM` in the given zone.
pub fn format_display_time(ts_ms: i64, tz: Tz) -> Option<String> {
    let utc = Utc.timestamp_millis_opt(ts_ms).single()?;
    Some(utc.with_timezone(&tz).format("%H:%M %d/%m").to_string())
}

/// Parse one raw date string under the given zone resolution.
///
/// Returns `None` when no strategy yields a structurally valid date; the
/// caller skips the item. `now` is taken once per aggregation run so the
/// future clamp is deterministic within a run.
pub fn parse_news_date(
    raw: &str,
    resolution: &ZoneResolution,
    now: DateTime<Utc>,
) -> Option<ParsedDate> {
    let variants = candidate_variants(&resolution.cleaned);

    let mut parsed: Option<(&'static str, Parsed)> = None;
    'chain: for (name, strategy) in STRATEGIES {
        for variant in &variants {
            if let Some(p) = strategy(variant) {
                parsed = Some((name, p));
                break 'chain;
            }
        }
    }
    let (strategy_name, parsed) = parsed?;

    let zone = resolution.zone;
    let (mut ts_ms, wall) = match parsed {
        Parsed::Absolute { ts_ms, wall } => (ts_ms, wall),
        Parsed::Wall(naive) => {
            let tz = zone.unwrap_or(JERUSALEM);
            (wall_in_zone_ms(naive, tz), naive)
        }
    };

    // Implausible future timestamps only get clamped when the zone was
    // guessed; an explicitly zoned source is trusted to mean what it says.
    let now_ms = now.timestamp_millis();
    if !resolution.explicit && ts_ms > now_ms + MAX_FUTURE_DRIFT_MS {
        tracing::warn!(
            raw,
            strategy = strategy_name,
            ahead_ms = ts_ms - now_ms,
            "clamping implausible future timestamp"
        );
        ts_ms = now_ms + MAX_FUTURE_DRIFT_MS - 1;
    }

    // Self-check: how far did zone resolution move this instant from a naive
    // UTC reading of the printed fields? Large drift signals a misbehaving
    // feed, not an error.
    let naive_utc_ms = wall.and_utc().timestamp_millis();
    let deviation_min = (ts_ms - naive_utc_ms).abs() / 60_000;
    if deviation_min >= DEVIATION_WARN_MINUTES {
        tracing::warn!(
            raw,
            strategy = strategy_name,
            deviation_min,
            "resolved timestamp deviates strongly from naive UTC reading"
        );
    }

    let display_time = extract_display_from_raw(raw)
        .or_else(|| format_display_time(ts_ms, zone.unwrap_or(JERUSALEM)))
        .unwrap_or_default();

    Some(ParsedDate {
        timestamp_utc: ts_ms,
        display_time,
        strategy: if resolution.explicit {
            ParseStrategy::Explicit
        } else {
            ParseStrategy::Inferred
        },
        zone,
    })
}
