//! Process configuration read from the environment.
//!
//! | Key | Required | Default |
//! |-----|----------|---------|
//! | `CATALOG_DATABASE_URL` | yes | |
//! | `ASSET_DIR` | yes | |
//! | `GEMINI_API_KEY` | yes | |
//! | `GEMINI_MODEL` | no | `gemini-1.5-flash-latest` |
//! | `GEMINI_BASE_URL` | no | `https://generativelanguage.googleapis.com/v1beta` |
//! | `INGEST_MAX_BATCH` | no | `12` |
//! | `INGEST_THROTTLE_MS` | no | `6000` |
//!
//! Empty values count as missing. Loading `.env` is the binary's job.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::security::credentials::{ExtractorCredentials, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::types::config::{BatchConfig, DEFAULT_MAX_BATCH_SIZE, DEFAULT_THROTTLE_INTERVAL};

/// Everything needed to wire the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_database_url: String,
    pub asset_dir: PathBuf,
    pub credentials: ExtractorCredentials,
    pub batch: BatchConfig,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::missing(key));

        let max_batch_size = match get("INGEST_MAX_BATCH") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => return Err(ConfigError::invalid("INGEST_MAX_BATCH", "must be at least 1")),
                Ok(n) => n,
                Err(e) => return Err(ConfigError::invalid("INGEST_MAX_BATCH", e.to_string())),
            },
            None => DEFAULT_MAX_BATCH_SIZE,
        };

        let throttle_interval = match get("INGEST_THROTTLE_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::invalid("INGEST_THROTTLE_MS", e.to_string()))?,
            None => DEFAULT_THROTTLE_INTERVAL,
        };

        let credentials = ExtractorCredentials::new(require("GEMINI_API_KEY")?)
            .with_model(get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()))
            .with_base_url(get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()));

        Ok(Self {
            catalog_database_url: require("CATALOG_DATABASE_URL")?,
            asset_dir: PathBuf::from(require("ASSET_DIR")?),
            credentials,
            batch: BatchConfig::new()
                .with_max_batch_size(max_batch_size)
                .with_throttle_interval(throttle_interval),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("CATALOG_DATABASE_URL", "sqlite://catalog.db"),
        ("ASSET_DIR", "/srv/cards"),
        ("GEMINI_API_KEY", "AIza-test"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.catalog_database_url, "sqlite://catalog.db");
        assert_eq!(config.asset_dir, PathBuf::from("/srv/cards"));
        assert_eq!(config.credentials.model, DEFAULT_MODEL);
        assert_eq!(config.credentials.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.credentials.api_key.expose(), "AIza-test");
        assert_eq!(config.batch.max_batch_size, 12);
        assert_eq!(config.batch.throttle_interval, Duration::from_millis(6000));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("INGEST_MAX_BATCH", "4"),
            ("INGEST_THROTTLE_MS", "250"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.credentials.model, "gemini-1.5-pro");
        assert_eq!(config.batch.max_batch_size, 4);
        assert_eq!(config.batch.throttle_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_missing_and_empty_keys() {
        assert_eq!(
            Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err(),
            ConfigError::missing("GEMINI_API_KEY")
        );

        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("ASSET_DIR", "  ");
        assert_eq!(
            Config::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::missing("ASSET_DIR")
        );
    }

    #[test]
    fn test_invalid_numbers() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("INGEST_MAX_BATCH", "0"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("INGEST_THROTTLE_MS", "soon"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert!(!format!("{:?}", config).contains("AIza-test"));
    }
}
