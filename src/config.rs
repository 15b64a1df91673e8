// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::latency::LATENCY_WINDOW;

pub const DEFAULT_URI: &str = "wss://fstream.binance.com/ws/btcusdt@bookTicker";
pub const DEFAULT_OUTPUT_PATH: &str = "aggregated_data.txt";


/// Aggregator configuration, optionally loaded from a TOML file.
///
/// Every field has a default, so an empty file (or no file) yields the
/// Binance futures `btcusdt@bookTicker` setup writing to `aggregated_data.txt`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    /// Upstream stream URL, `wss://` or `ws://`.
    pub uri: String,
    /// Output file, truncated when the writer starts.
    pub output_path: PathBuf,
    /// Number of samples in each per-connection latency window.
    pub latency_window: usize,
    pub annotation: Annotation,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            latency_window: LATENCY_WINDOW,
            annotation: Annotation::default(),
        }
    }
}

impl FeedConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load config '{}'", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: FeedConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.latency_window == 0 {
            bail!("latency_window must be at least 1");
        }
        if !(self.uri.starts_with("wss://") || self.uri.starts_with("ws://")) {
            bail!("uri must use the ws:// or wss:// scheme, got '{}'", self.uri);
        }
        Ok(())
    }
}


/// How the measured latency is attached to a payload before it is written.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Annotation {
    /// Concatenate `, "latency_ms":<N>` after the payload as-is.
    /// The resulting line is not valid JSON.
    #[default]
    Append,
    /// Insert `,"latency_ms":<N>` before the closing brace so the line stays
    /// a JSON object. Falls back to `Append` when there is no closing brace.
    Inline,
}

impl Annotation {
    pub fn apply(&self, payload: &str, latency_ms: i64) -> String {
        if let Self::Inline = self {
            let body = payload.trim_end();
            if let Some(head) = body.strip_suffix('}') {
                let separator = if head.trim_end().ends_with('{') { "" } else { "," };
                return format!("{head}{separator}\"latency_ms\":{latency_ms}}}");
            }
        }
        format!("{payload}, \"latency_ms\":{latency_ms}")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FeedConfig::from_toml_str("").unwrap();

        assert_eq!(config.uri, DEFAULT_URI);
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert_eq!(config.latency_window, 100);
        assert_eq!(config.annotation, Annotation::Append);
    }

    #[test]
    fn test_overrides() {
        let config = FeedConfig::from_toml_str(
            r#"
            uri = "ws://127.0.0.1:9001/ws/btcusdt@bookTicker"
            output_path = "/tmp/out.txt"
            latency_window = 10
            annotation = "inline"
            "#,
        )
        .unwrap();

        assert_eq!(config.uri, "ws://127.0.0.1:9001/ws/btcusdt@bookTicker");
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.txt"));
        assert_eq!(config.latency_window, 10);
        assert_eq!(config.annotation, Annotation::Inline);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(FeedConfig::from_toml_str("latency_window = 0").is_err());
        assert!(FeedConfig::from_toml_str(r#"uri = "https://example.com""#).is_err());
        assert!(FeedConfig::from_toml_str(r#"annotation = "pretty""#).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(FeedConfig::load(Path::new("does/not/exist.toml")).is_err());
    }

    #[test]
    fn test_append_annotation_is_naive_concatenation() {
        let line = Annotation::Append.apply(r#"{"u":1,"T":1000,"x":"a"}"#, 5);
        assert_eq!(line, r#"{"u":1,"T":1000,"x":"a"}, "latency_ms":5"#);
    }

    #[test]
    fn test_inline_annotation_keeps_json_valid() {
        let line = Annotation::Inline.apply(r#"{"u":1,"T":1000}"#, -3);
        assert_eq!(line, r#"{"u":1,"T":1000,"latency_ms":-3}"#);

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["latency_ms"], -3);

        assert_eq!(Annotation::Inline.apply("{}", 2), r#"{"latency_ms":2}"#);
        assert_eq!(Annotation::Inline.apply("[1]", 2), r#"[1], "latency_ms":2"#);
    }
}
