//! Runtime configuration resolved from a [`ConfigPort`].

use std::time::Duration;

use crate::domain::config_validation::validate_stream_config;
use crate::domain::error::LivefeedError;
use crate::domain::stream::ReconnectPolicy;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_ENDPOINT: &str = "wss://stream.binance.com:9443";
pub const DEFAULT_RECONNECT_BASE_MS: i64 = 1000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: i64 = 5;
pub const DEFAULT_MAX_CANDLES: i64 = 1000;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    pub endpoint: String,
    pub reconnect: ReconnectPolicy,
    pub max_candles: usize,
    pub log_filter: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect: ReconnectPolicy {
                base: Duration::from_millis(DEFAULT_RECONNECT_BASE_MS as u64),
                max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS as u32,
            },
            max_candles: DEFAULT_MAX_CANDLES as usize,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl StreamConfig {
    /// Validate then read every key, falling back to defaults for absent ones.
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, LivefeedError> {
        validate_stream_config(config)?;

        let endpoint = config
            .get_string("stream", "endpoint")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let base_ms = config.get_int("stream", "reconnect_base_ms", DEFAULT_RECONNECT_BASE_MS);
        let max_attempts = config.get_int(
            "stream",
            "max_reconnect_attempts",
            DEFAULT_MAX_RECONNECT_ATTEMPTS,
        );
        let max_candles = config.get_int("history", "max_candles", DEFAULT_MAX_CANDLES);
        let log_filter = config
            .get_string("log", "filter")
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            endpoint,
            reconnect: ReconnectPolicy {
                base: Duration::from_millis(base_ms as u64),
                max_attempts: max_attempts as u32,
            },
            max_candles: max_candles as usize,
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            )
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }
        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = StreamConfig::from_port(&MapConfig::new(&[])).unwrap();
        assert_eq!(config, StreamConfig::default());
    }

    #[test]
    fn reads_all_keys() {
        let config = StreamConfig::from_port(&MapConfig::new(&[
            ("stream", "endpoint", "wss://example.test"),
            ("stream", "reconnect_base_ms", "250"),
            ("stream", "max_reconnect_attempts", "3"),
            ("history", "max_candles", "50"),
            ("log", "filter", "livefeed=debug"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint, "wss://example.test");
        assert_eq!(config.reconnect.base, Duration::from_millis(250));
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.max_candles, 50);
        assert_eq!(config.log_filter, "livefeed=debug");
    }

    #[test]
    fn invalid_value_is_rejected() {
        let err = StreamConfig::from_port(&MapConfig::new(&[(
            "stream",
            "reconnect_base_ms",
            "0",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("reconnect_base_ms"));
    }
}
