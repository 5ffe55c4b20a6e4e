// tests/client_normalize.rs
//
// Display-side normalization over wire payloads, including payloads from an
// older server revision that never computed timestampUtc.

use chrono::{TimeZone, Utc};

use israel_news_aggregator::client::{
    normalized_display_time, prepare_news_items, FetchNewsResponse,
};
use israel_news_aggregator::ZoneRules;

fn now_ms() -> i64 {
    Utc.with_ymd_and_hms(2025, 11, 12, 20, 0, 0)
        .unwrap()
        .timestamp_millis()
}

#[test]
fn old_server_payload_falls_back_to_pub_date_parsing() {
    // No timestamp fields at all: the client parses pubDate itself.
    let payload = r#"{
        "items": [
            {
                "title": "ישן אבל עובד",
                "link": "https://legacy.example/1",
                "source": "ערוץ 7",
                "pubDate": "Wed, 12 Nov 2025 18:00:00 GMT"
            }
        ]
    }"#;
    let parsed: FetchNewsResponse = serde_json::from_str(payload).unwrap();
    let items = prepare_news_items(
        parsed.items.unwrap_or_default(),
        now_ms(),
        &ZoneRules::default(),
    );
    assert_eq!(items.len(), 1);
    let expected = Utc
        .with_ymd_and_hms(2025, 11, 12, 18, 0, 0)
        .unwrap()
        .timestamp_millis();
    assert_eq!(items[0].timestamp, expected);
}

#[test]
fn liar_sources_get_shifted_even_from_old_servers() {
    // 18:05 stamped GMT from a liar source, no server correction in the
    // payload: the client shifts by Israel's winter offset (2h).
    let payload = r#"{
        "items": [
            {
                "title": "דיווח",
                "link": "https://www.israelhayom.co.il/1",
                "source": "ישראל היום",
                "pubDate": "Wed, 12 Nov 2025 18:05:00 GMT",
                "timestamp": 1762970700000
            }
        ]
    }"#;
    let parsed: FetchNewsResponse = serde_json::from_str(payload).unwrap();
    let items = prepare_news_items(
        parsed.items.unwrap_or_default(),
        now_ms(),
        &ZoneRules::default(),
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].timestamp, 1762970700000 - 2 * 60 * 60 * 1000);
}

#[test]
fn ordering_across_liar_and_honest_sources_is_corrected() {
    // The honest source published at 20:00 Israel time (18:00 UTC), the liar
    // "published" at 18:05 "GMT" which is really 16:05 UTC. Uncorrected, the
    // liar would outrank the honest source.
    let honest_ts = Utc
        .with_ymd_and_hms(2025, 11, 12, 18, 0, 0)
        .unwrap()
        .timestamp_millis();
    let liar_fake_ts = Utc
        .with_ymd_and_hms(2025, 11, 12, 18, 5, 0)
        .unwrap()
        .timestamp_millis();

    let payload = serde_json::json!({
        "items": [
            {
                "title": "נוביק",
                "link": "https://www.inn.co.il/1",
                "source": "ערוץ 7",
                "pubDate": "",
                "timestampUtc": honest_ts
            },
            {
                "title": "ברקוביץ",
                "link": "https://www.israelhayom.co.il/1",
                "source": "ישראל היום",
                "pubDate": "",
                "timestampUtc": liar_fake_ts
            }
        ]
    });
    let parsed: FetchNewsResponse = serde_json::from_value(payload).unwrap();
    let items = prepare_news_items(
        parsed.items.unwrap_or_default(),
        now_ms(),
        &ZoneRules::default(),
    );
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source, "ערוץ 7", "honest 20:00 outranks liar 18:05");
}

#[test]
fn absent_items_field_is_tolerated() {
    let parsed: FetchNewsResponse = serde_json::from_str("{}").unwrap();
    let items = prepare_news_items(
        parsed.items.unwrap_or_default(),
        now_ms(),
        &ZoneRules::default(),
    );
    assert!(items.is_empty());
}

#[test]
fn display_time_falls_back_to_raw_extraction_when_formatting_is_moot() {
    let payload = serde_json::json!({
        "items": [
            {
                "title": "t",
                "link": "https://a.example/1",
                "source": "BBC",
                "pubDate": "Wed, 12 Nov 2025 18:00:00 GMT",
                "timestampUtc": now_ms() - 1000,
                "displayTime": "18:00 12/11"
            }
        ]
    });
    let parsed: FetchNewsResponse = serde_json::from_value(payload).unwrap();
    let items = prepare_news_items(
        parsed.items.unwrap_or_default(),
        now_ms(),
        &ZoneRules::default(),
    );
    // Honest source with a server display string: passed through verbatim.
    assert_eq!(
        normalized_display_time(&items[0], &ZoneRules::default()),
        "18:00 12/11"
    );
}
