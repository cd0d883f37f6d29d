//! Poller configuration.

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Configuration for an [`InputPoller`](crate::InputPoller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Deliver input even when the capture target is not in the foreground.
    pub input_sink: bool,
    /// Keep legacy mouse messages out of the raw stream.
    pub no_legacy: bool,
    /// Name given to the worker thread.
    pub thread_name: String,
    /// How long `start_confirmed` waits for the worker's setup report (ms).
    pub ready_timeout_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            input_sink: true,
            no_legacy: true,
            thread_name: "mouse-poll".into(),
            ready_timeout_ms: 2000,
        }
    }
}

impl PollerConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        debug!(?path, "Loaded poller config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert!(config.input_sink);
        assert!(config.no_legacy);
        assert_eq!(config.thread_name, "mouse-poll");
        assert_eq!(config.ready_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PollerConfig::from_yaml_str("no_legacy: false\nready_timeout_ms: 500\n")
            .expect("valid yaml");
        assert!(config.input_sink);
        assert!(!config.no_legacy);
        assert_eq!(config.ready_timeout_ms, 500);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = PollerConfig::from_yaml_str("input_sink: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = PollerConfig::load("/definitely/not/here/mousepoll.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
