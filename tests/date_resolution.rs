// tests/date_resolution.rs
//
// End-to-end resolution of raw date strings: zone resolution + parse chain.
// Covers explicit round-trips, the known-liar correction, abbreviation
// inference, clamp asymmetry, and idempotence.

use chrono::{DateTime, TimeZone, Utc};

use israel_news_aggregator::normalize::dates::{parse_news_date, MAX_FUTURE_DRIFT_MS};
use israel_news_aggregator::normalize::zones::{resolve, ZoneRules};
use israel_news_aggregator::ParseStrategy;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 0).unwrap()
}

fn resolve_and_parse(raw: &str, link: &str, source: &str) -> Option<(i64, ParseStrategy)> {
    let rules = ZoneRules::default();
    let resolution = resolve(raw, link, source, &rules);
    parse_news_date(raw, &resolution, fixed_now())
        .map(|parsed| (parsed.timestamp_utc, parsed.strategy))
}

fn utc_ms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
        .unwrap()
        .timestamp_millis()
}

#[test]
fn rfc2822_with_gmt_round_trips_to_exact_utc() {
    let (ts, strategy) =
        resolve_and_parse("Wed, 12 Nov 2025 18:05:00 GMT", "https://bbc.com/x", "BBC").unwrap();
    assert_eq!(ts, utc_ms(2025, 11, 12, 18, 5, 0));
    assert_eq!(strategy, ParseStrategy::Explicit);
}

#[test]
fn rfc2822_with_numeric_offset_round_trips() {
    let (ts, strategy) = resolve_and_parse(
        "Wed, 12 Nov 2025 18:05:00 +0200",
        "https://example.com/x",
        "whoever",
    )
    .unwrap();
    assert_eq!(ts, utc_ms(2025, 11, 12, 16, 5, 0));
    assert_eq!(strategy, ParseStrategy::Explicit);
}

#[test]
fn known_liar_gmt_resolves_as_jerusalem_wall_time() {
    // 18:05 "GMT" from a liar is really 18:05 Asia/Jerusalem; November is
    // standard time, so the true instant is 16:05 UTC.
    let (ts, strategy) = resolve_and_parse(
        "Wed, 12 Nov 2025 18:05:00 GMT",
        "https://www.israelhayom.co.il/news/1",
        "ישראל היום",
    )
    .unwrap();
    assert_eq!(ts, utc_ms(2025, 11, 12, 16, 5, 0));
    assert_eq!(strategy, ParseStrategy::Inferred);
}

#[test]
fn liar_correction_applies_to_iso_z_dates_too() {
    let (ts, _) = resolve_and_parse(
        "2025-11-12T18:05:00Z",
        "https://news.walla.co.il/item/1",
        "וואלה",
    )
    .unwrap();
    assert_eq!(ts, utc_ms(2025, 11, 12, 16, 5, 0));
}

#[test]
fn abbreviation_is_stripped_and_zone_applied() {
    let (ts, strategy) =
        resolve_and_parse("12 Nov 2025 21:19:00 IDT", "https://x.example/a", "anything").unwrap();
    // Wall time in Jerusalem, November: UTC+2.
    assert_eq!(ts, utc_ms(2025, 11, 12, 19, 19, 0));
    assert_eq!(strategy, ParseStrategy::Inferred);
}

#[test]
fn eest_token_resolves_in_athens() {
    let (ts, _) =
        resolve_and_parse("12 Jul 2025 10:00:00 EEST", "https://x.example/a", "agency").unwrap();
    // July in Athens: UTC+3.
    assert_eq!(ts, utc_ms(2025, 7, 12, 7, 0, 0));
}

#[test]
fn inferred_future_dates_clamp_explicit_do_not() {
    let now = fixed_now();
    let now_ms = now.timestamp_millis();

    // Two hours ahead, no offset in the string: clamped to now + 10min - 1ms.
    let (clamped, _) =
        resolve_and_parse("14/11/2025 16:00:00", "https://x.example/a", "מקומי").unwrap();
    assert_eq!(clamped, now_ms + MAX_FUTURE_DRIFT_MS - 1);

    // Two hours ahead with an explicit offset: trusted as-is.
    let (trusted, _) =
        resolve_and_parse("2025-11-14T14:00:00+00:00", "https://x.example/a", "זר").unwrap();
    assert_eq!(trusted, utc_ms(2025, 11, 14, 14, 0, 0));
}

#[test]
fn parsing_is_idempotent_for_fixed_now() {
    let raw = "Wed, 12 Nov 2025 18:05:00 GMT";
    let a = resolve_and_parse(raw, "https://www.maariv.co.il/1", "מעריב").unwrap();
    let b = resolve_and_parse(raw, "https://www.maariv.co.il/1", "מעריב").unwrap();
    assert_eq!(a, b);
}

#[test]
fn unparseable_dates_yield_none() {
    assert!(resolve_and_parse("בקרוב", "https://x.example/a", "x").is_none());
    assert!(resolve_and_parse("tomorrow-ish", "https://x.example/a", "x").is_none());
}

#[test]
fn display_time_matches_source_printed_wall_time() {
    let rules = ZoneRules::default();
    let raw = "Wed, 12 Nov 2025 18:05:00 GMT";
    let resolution = resolve(raw, "https://www.israelhayom.co.il/1", "ישראל היום", &rules);
    let parsed = parse_news_date(raw, &resolution, fixed_now()).unwrap();
    // Resolved instant is 16:05 UTC, but the display echoes the raw 18:05.
    assert_eq!(parsed.display_time, "18:05 12/11");
    assert_eq!(parsed.zone.map(|z| z.name().to_string()).as_deref(), Some("Asia/Jerusalem"));
}
