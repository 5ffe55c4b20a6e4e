// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::FeedSource;

const ENV_PATH: &str = "FEED_SOURCES_PATH";
const DEFAULT_TOML: &str = "config/feed_sources.toml";
const DEFAULT_JSON: &str = "config/feed_sources.json";

/// Load feed sources from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<FeedSource>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load feed sources using env var + fallbacks:
/// 1) $FEED_SOURCES_PATH
/// 2) config/feed_sources.toml
/// 3) config/feed_sources.json
pub fn load_sources_default() -> Result<Vec<FeedSource>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("FEED_SOURCES_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from(DEFAULT_TOML);
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_JSON);
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<FeedSource>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    // Try JSON array
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    // Fallback: also try TOML if not attempted
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feed sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<FeedSource>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<FeedSource>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<FeedSource>> {
    let v: Vec<FeedSource> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Drop rows with blank names or urls; trim what survives.
fn clean_list(items: Vec<FeedSource>) -> Vec<FeedSource> {
    items
        .into_iter()
        .filter_map(|mut src| {
            src.name = src.name.trim().to_string();
            src.url = src.url.trim().to_string();
            (!src.name.is_empty() && !src.url.is_empty()).then_some(src)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn trim_and_formats_work() {
        let toml = r#"
            [[sources]]
            name = " ערוץ 7 "
            url = "https://www.inn.co.il/Rss.aspx"

            [[sources]]
            name = ""
            url = "https://dropped.example"
        "#;
        let json = r#"[{"name": "ynet", "url": " https://www.ynet.co.il/Integration/StoryRss2.xml ", "active": false}]"#;

        let toml_out = parse_toml(toml).unwrap();
        assert_eq!(toml_out.len(), 1);
        assert_eq!(toml_out[0].name, "ערוץ 7");
        assert!(toml_out[0].active, "active defaults to true");

        let json_out = parse_json(json).unwrap();
        assert_eq!(json_out.len(), 1);
        assert!(!json_out[0].active);
        assert_eq!(
            json_out[0].url,
            "https://www.ynet.co.il/Integration/StoryRss2.xml"
        );
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD into a temp dir so a real config/ in the repo can't interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // No files in temp CWD → empty
        let v = load_sources_default().unwrap();
        assert!(v.is_empty());

        // Env takes precedence
        let p_json = tmp.path().join("feed_sources.json");
        fs::write(&p_json, r#"[{"name": "X", "url": "https://x.example/rss"}]"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let v2 = load_sources_default().unwrap();
        assert_eq!(v2.len(), 1);
        assert_eq!(v2[0].name, "X");
        env::remove_var(ENV_PATH);

        // Restore CWD
        env::set_current_dir(&old).unwrap();
    }
}
