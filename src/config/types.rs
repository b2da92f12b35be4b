//! Configuration types for the bot console
//!
//! Loaded from YAML; every field has a default so an empty (or missing)
//! file yields a working configuration pointed at a local bot.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::shared::ReconnectConfig;
use crate::api::{ExecutionMode, StrategySelector};
use crate::error::{AppError, Result};

/// Default bot API location
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Log stream path on the bot API host
pub const LOG_STREAM_PATH: &str = "/ws/logs";

// ============================================================================
// Configuration Structs
// ============================================================================

/// Where the remote bot is reachable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST base URL, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Explicit log stream URL; derived from `base_url` when absent
    pub log_stream_url: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            log_stream_url: None,
        }
    }
}

impl ApiConfig {
    /// Log stream URL: explicit value, or `base_url` with `http`→`ws`
    pub fn log_stream_url(&self) -> String {
        if let Some(url) = &self.log_stream_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}{}", ws_base, LOG_STREAM_PATH)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "api.base_url must start with http:// or https:// (got '{}')",
                self.base_url
            )));
        }
        let stream_url = self.log_stream_url();
        if !(stream_url.starts_with("ws://") || stream_url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "api.log_stream_url must start with ws:// or wss:// (got '{}')",
                stream_url
            )));
        }
        Ok(())
    }
}

/// Timer settings for every poller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Periodic remote status poll (ms)
    pub status_interval_ms: u64,
    /// Market data + sentiment poll (ms)
    pub telemetry_interval_ms: u64,
    /// Open position poll (ms)
    pub position_interval_ms: u64,
    /// News poll (ms)
    pub news_interval_ms: u64,
    /// Status polls after a stop before giving up
    pub stop_confirm_attempts: u32,
    /// Delay between stop-confirmation polls (ms)
    pub stop_confirm_interval_ms: u64,
    /// Consecutive STOPPED observations tolerated while STARTING
    pub startup_grace_polls: u32,
    /// Consecutive failures of every telemetry source before it is stale
    pub stale_after_failures: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: 2_000,
            telemetry_interval_ms: 2_000,
            position_interval_ms: 2_000,
            news_interval_ms: 60_000,
            stop_confirm_attempts: 30,
            stop_confirm_interval_ms: 1_000,
            startup_grace_polls: 5,
            stale_after_failures: 3,
        }
    }
}

impl PollingConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    pub fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms)
    }

    pub fn news_interval(&self) -> Duration {
        Duration::from_millis(self.news_interval_ms)
    }

    pub fn stop_confirm_interval(&self) -> Duration {
        Duration::from_millis(self.stop_confirm_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("status_interval_ms", self.status_interval_ms),
            ("telemetry_interval_ms", self.telemetry_interval_ms),
            ("position_interval_ms", self.position_interval_ms),
            ("news_interval_ms", self.news_interval_ms),
            ("stop_confirm_interval_ms", self.stop_confirm_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(AppError::Config(format!("polling.{} must be > 0", name)));
            }
        }
        if self.stop_confirm_attempts == 0 {
            return Err(AppError::Config(
                "polling.stop_confirm_attempts must be > 0".to_string(),
            ));
        }
        if self.startup_grace_polls == 0 {
            return Err(AppError::Config(
                "polling.startup_grace_polls must be > 0".to_string(),
            ));
        }
        if self.stale_after_failures == 0 {
            return Err(AppError::Config(
                "polling.stale_after_failures must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Log stream settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StreamConfig {
    pub reconnect: ReconnectConfig,
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        let r = &self.reconnect;
        if r.max_attempts == 0 {
            return Err(AppError::Config(
                "stream.reconnect.max_attempts must be > 0".to_string(),
            ));
        }
        if r.initial_delay_ms == 0 || r.initial_delay_ms > r.max_delay_ms {
            return Err(AppError::Config(format!(
                "stream.reconnect: need 0 < initial_delay_ms <= max_delay_ms (got {} / {})",
                r.initial_delay_ms, r.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// Operator defaults applied when the console starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionDefaults {
    pub mode: ExecutionMode,
    pub strategy: StrategySelector,
}

/// Root application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub stream: StreamConfig,
    pub session: SessionDefaults,
}

impl AppConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.polling.validate()?;
        self.stream.validate()?;
        if self.session.strategy.as_str().trim().is_empty() {
            return Err(AppError::Config(
                "session.strategy cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.stop_confirm_attempts, 30);
        assert_eq!(config.polling.stop_confirm_interval(), Duration::from_secs(1));
        assert_eq!(config.session.mode, ExecutionMode::Simulated);
        assert_eq!(config.session.strategy.as_str(), "MOMENTUM");
    }

    #[test]
    fn test_log_stream_url_derived_from_base() {
        let api = ApiConfig {
            base_url: "http://10.0.0.5:8000/".to_string(),
            log_stream_url: None,
        };
        assert_eq!(api.log_stream_url(), "ws://10.0.0.5:8000/ws/logs");

        let api = ApiConfig {
            base_url: "https://bot.example.com".to_string(),
            log_stream_url: None,
        };
        assert_eq!(api.log_stream_url(), "wss://bot.example.com/ws/logs");
    }

    #[test]
    fn test_explicit_log_stream_url_wins() {
        let api = ApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            log_stream_url: Some("ws://logs.internal:9000/stream".to_string()),
        };
        assert_eq!(api.log_stream_url(), "ws://logs.internal:9000/stream");
    }

    #[test]
    fn test_bad_base_url_fails() {
        let mut config = AppConfig::default();
        config.api.base_url = "localhost:8000".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("api.base_url"));
    }

    #[test]
    fn test_zero_interval_fails() {
        let mut config = AppConfig::default();
        config.polling.status_interval_ms = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("status_interval_ms"), "Got: {}", err);
    }

    #[test]
    fn test_zero_stop_attempts_fails() {
        let mut config = AppConfig::default();
        config.polling.stop_confirm_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_delay_order_enforced() {
        let mut config = AppConfig::default();
        config.stream.reconnect.initial_delay_ms = 20_000;
        config.stream.reconnect.max_delay_ms = 1_000;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("stream.reconnect"), "Got: {}", err);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
api:
  base_url: http://192.168.1.20:8000
polling:
  stop_confirm_attempts: 10
session:
  mode: LIVE
  strategy: ORB
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.stop_confirm_attempts, 10);
        assert_eq!(config.polling.status_interval_ms, 2_000);
        assert_eq!(config.session.mode, ExecutionMode::Live);
        assert_eq!(config.session.strategy.as_str(), "ORB");
        assert_eq!(config.stream.reconnect, ReconnectConfig::default());
    }
}
