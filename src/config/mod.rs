//! Ingestion configuration.
//!
//! Loaded from a TOML file. User-defined sources extend the built-in
//! source table, overriding a built-in entry when the names collide, so a
//! broken built-in rule can be patched without a new release.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::error::{NewsstandError, Result};
use crate::client::sources::builtin_sources;
use crate::domain::Source;
use crate::fetcher::BackoffPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds; doubles per attempt.
    pub initial_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_attempts: 4,
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(self.initial_delay_ms), self.max_attempts)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Bounded worker pool size for parallel feed fetches.
    pub workers: Option<usize>,
    pub backoff: BackoffConfig,
    /// Additional or overriding sources.
    pub sources: Vec<Source>,
}

impl IngestConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| NewsstandError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for source in &self.sources {
            if source.name.is_empty() {
                return Err(NewsstandError::Config("Source with empty name".into()));
            }
            for feed in &source.feeds {
                url::Url::parse(&feed.url).map_err(|e| {
                    NewsstandError::Config(format!(
                        "Source {}: bad feed URL {}: {e}",
                        source.name, feed.url
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// The built-in source table with user sources merged over it.
    pub fn effective_sources(&self) -> Vec<Source> {
        let mut by_name: HashMap<String, Source> = builtin_sources()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        for source in &self.sources {
            by_name.insert(source.name.clone(), source.clone());
        }

        let mut sources: Vec<Source> = by_name.into_values().collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_builtin_sources() {
        let config = IngestConfig::default();
        let sources = config.effective_sources();
        assert!(sources.iter().any(|s| s.name == "Headline"));
        assert!(sources.iter().any(|s| s.name == "HKET"));
        assert_eq!(config.backoff.max_attempts, 4);
    }

    #[test]
    fn test_parse_user_source() {
        let raw = r#"
            workers = 4

            [backoff]
            initial_delay_ms = 500
            max_attempts = 3

            [[sources]]
            name = "Gazette"
            base_host = "https://gazette.example"

            [[sources.feeds]]
            url = "https://gazette.example/rss"
            category = "news"

            [sources.rule.body]
            separator = "<br>"

            [sources.rule.body.fragment]
            start = "<p>"
            end = "</p>"

            [sources.rule.images]
            url_attr = "src"

            [sources.rule.images.container]
            start = "<img "
            end = "/>"
        "#;

        let config = IngestConfig::from_toml(raw).unwrap();
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.backoff.initial_delay_ms, 500);

        let sources = config.effective_sources();
        let gazette = sources.iter().find(|s| s.name == "Gazette").unwrap();
        assert_eq!(gazette.feeds.len(), 1);
        assert_eq!(gazette.rule.body.fragment.start, "<p>");
        // Builtins still present alongside the user source
        assert!(sources.iter().any(|s| s.name == "Headline"));
    }

    #[test]
    fn test_user_source_overrides_builtin_by_name() {
        let raw = r#"
            [[sources]]
            name = "HKET"
            base_host = "https://mirror.example"

            [[sources.feeds]]
            url = "https://mirror.example/rss"

            [sources.rule.body.fragment]
            start = "<p>"
            end = "</p>"

            [sources.rule.images]
            url_attr = "src"

            [sources.rule.images.container]
            start = "<img "
            end = "/>"
        "#;

        let config = IngestConfig::from_toml(raw).unwrap();
        let sources = config.effective_sources();
        let hket: Vec<_> = sources.iter().filter(|s| s.name == "HKET").collect();
        assert_eq!(hket.len(), 1);
        assert_eq!(hket[0].base_host, "https://mirror.example");
    }

    #[test]
    fn test_bad_feed_url_is_a_config_error() {
        let raw = r#"
            [[sources]]
            name = "Broken"
            base_host = "https://broken.example"

            [[sources.feeds]]
            url = "not a url"

            [sources.rule.body.fragment]
            start = "<p>"
            end = "</p>"

            [sources.rule.images]
            url_attr = "src"

            [sources.rule.images.container]
            start = "<img "
            end = "/>"
        "#;

        assert!(matches!(
            IngestConfig::from_toml(raw),
            Err(NewsstandError::Config(_))
        ));
    }

    #[test]
    fn test_empty_toml_is_valid() {
        let config = IngestConfig::from_toml("").unwrap();
        assert_eq!(config.workers, None);
        assert!(config.sources.is_empty());
    }
}
