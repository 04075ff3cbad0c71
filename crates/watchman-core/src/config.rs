//! Runtime configuration shared by the classifier client and the capture loop.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_CAPTURE_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_CLASSIFY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Capture constraints requested from the video device.
///
/// Devices deliver JPEG frames already encoded; the width and height here are
/// the request, recorded on each [`Frame`](crate::Frame) as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Watchman settings.
///
/// Deserializable from any serde source; [`from_env`](Self::from_env) builds
/// one from process environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchmanConfig {
    /// API key for the classification service.
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub capture_interval_secs: u64,
    pub classify_timeout_secs: u64,
    pub frame: FrameSettings,
    pub log_capacity: usize,
    /// Directory backing the durable key-value store.
    pub data_dir: PathBuf,
}

impl Default for WatchmanConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            capture_interval_secs: DEFAULT_CAPTURE_INTERVAL_SECS,
            classify_timeout_secs: DEFAULT_CLASSIFY_TIMEOUT_SECS,
            frame: FrameSettings::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            data_dir: PathBuf::from("watchman-data"),
        }
    }
}

impl WatchmanConfig {
    /// Build from the process environment.
    ///
    /// `API_KEY` is required. Optional overrides: `WATCHMAN_ENDPOINT`,
    /// `WATCHMAN_MODEL`, `WATCHMAN_CAPTURE_INTERVAL_SECS`,
    /// `WATCHMAN_CLASSIFY_TIMEOUT_SECS`, `WATCHMAN_DATA_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, with the same keys as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.api_key = lookup("API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("API_KEY"))?;

        if let Some(endpoint) = lookup("WATCHMAN_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(model) = lookup("WATCHMAN_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("WATCHMAN_CAPTURE_INTERVAL_SECS") {
            config.capture_interval_secs = parse_secs("WATCHMAN_CAPTURE_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("WATCHMAN_CLASSIFY_TIMEOUT_SECS") {
            config.classify_timeout_secs = parse_secs("WATCHMAN_CLASSIFY_TIMEOUT_SECS", &raw)?;
        }
        if let Some(dir) = lookup("WATCHMAN_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        config.validate()?;
        tracing::debug!(
            endpoint = %config.endpoint,
            model = %config.model,
            capture_interval_secs = config.capture_interval_secs,
            "loaded configuration"
        );
        Ok(config)
    }

    /// Reject settings the capture loop cannot run with: zero-second interval
    /// or timeout, and a log capacity outside `1..=100`.
    ///
    /// [`from_env`](Self::from_env) validates on its own; configs built
    /// through serde or struct literals are checked by their consumers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture_interval_secs == 0 {
            return Err(invalid("capture_interval_secs", self.capture_interval_secs));
        }
        if self.classify_timeout_secs == 0 {
            return Err(invalid("classify_timeout_secs", self.classify_timeout_secs));
        }
        if !(1..=DEFAULT_LOG_CAPACITY).contains(&self.log_capacity) {
            return Err(invalid("log_capacity", self.log_capacity));
        }
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(ConfigError::Invalid {
                key: "frame",
                value: format!("{}x{}", self.frame.width, self.frame.height),
            });
        }
        Ok(())
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.capture_interval_secs)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }
}

fn invalid(key: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

/// Positive whole seconds.
fn parse_secs(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(invalid(key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = WatchmanConfig::default();
        assert_eq!(config.capture_interval(), Duration::from_secs(10));
        assert_eq!(config.log_capacity, 100);
        assert_eq!(config.frame.width, 1280);
        assert_eq!(config.frame.height, 720);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn api_key_is_required() {
        let err = WatchmanConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_KEY")));

        let err = WatchmanConfig::from_lookup(lookup_from(&[("API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_KEY")));
    }

    #[test]
    fn overrides_apply() {
        let config = WatchmanConfig::from_lookup(lookup_from(&[
            ("API_KEY", "k"),
            ("WATCHMAN_MODEL", "other-model"),
            ("WATCHMAN_CAPTURE_INTERVAL_SECS", "3"),
            ("WATCHMAN_DATA_DIR", "/tmp/wm"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.model, "other-model");
        assert_eq!(config.capture_interval(), Duration::from_secs(3));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/wm"));
        assert_eq!(config.classify_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn zero_interval_is_invalid() {
        let err = WatchmanConfig::from_lookup(lookup_from(&[
            ("API_KEY", "k"),
            ("WATCHMAN_CAPTURE_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: WatchmanConfig =
            serde_json::from_str(r#"{"api_key": "k", "classify_timeout_secs": 5}"#).unwrap();
        assert_eq!(config.classify_timeout(), Duration::from_secs(5));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn validate_rejects_zero_periods_from_serde() {
        let config: WatchmanConfig =
            serde_json::from_str(r#"{"capture_interval_secs": 0}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "capture_interval_secs",
                ..
            })
        ));

        let config = WatchmanConfig {
            classify_timeout_secs: 0,
            ..WatchmanConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "classify_timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn validate_caps_log_capacity_at_one_hundred() {
        for capacity in [0, 101, 500] {
            let config = WatchmanConfig {
                log_capacity: capacity,
                ..WatchmanConfig::default()
            };
            assert!(config.validate().is_err(), "{capacity}");
        }
        for capacity in [1, 100] {
            let config = WatchmanConfig {
                log_capacity: capacity,
                ..WatchmanConfig::default()
            };
            assert!(config.validate().is_ok(), "{capacity}");
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(WatchmanConfig::default().validate().is_ok());
    }
}
