//! Configuration loader for YAML files
//!
//! Loads, overlays environment overrides and validates the console config.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{AppError, Result};

use super::types::AppConfig;

/// Env var naming the config file
pub const CONFIG_PATH_ENV: &str = "BOT_CONSOLE_CONFIG";
/// Config file used when `BOT_CONSOLE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
/// Overrides `api.base_url`
pub const API_URL_ENV: &str = "BOT_API_URL";
/// Overrides `api.log_stream_url`
pub const LOG_STREAM_URL_ENV: &str = "BOT_LOG_STREAM_URL";

/// Load configuration from a YAML file
///
/// # Returns
/// * `Ok(AppConfig)` - Parsed, env-overridden and validated configuration
/// * `Err(AppError)` - File not found, parse error, or validation failure
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    // An empty file parses as YAML null; treat it as "all defaults"
    let config: Option<AppConfig> = serde_yaml::from_reader(reader).map_err(|e| {
        AppError::Config(format!(
            "YAML parse error in '{}': {}",
            path.display(),
            e
        ))
    })?;

    finish(config.unwrap_or_default())
}

/// Load configuration from a YAML string (useful for testing)
pub fn load_config_from_str(yaml_content: &str) -> Result<AppConfig> {
    let config: Option<AppConfig> = serde_yaml::from_str(yaml_content)
        .map_err(|e| AppError::Config(format!("YAML parse error: {}", e)))?;

    finish(config.unwrap_or_default())
}

/// Resolve the config path from `BOT_CONSOLE_CONFIG`, then load it.
///
/// A missing file is not an error: defaults are used with a warning.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    if !path.exists() {
        warn!(
            event_type = "CONFIG",
            path = %path.display(),
            "Config file not found, using defaults"
        );
        return finish(AppConfig::default());
    }
    load_config(&path)
}

fn finish(mut config: AppConfig) -> Result<AppConfig> {
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Overlay `BOT_API_URL` / `BOT_LOG_STREAM_URL` onto the parsed config
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(url) = non_empty_env(API_URL_ENV) {
        config.api.base_url = url;
    }
    if let Some(url) = non_empty_env(LOG_STREAM_URL_ENV) {
        config.api.log_stream_url = Some(url);
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_CONFIG_YAML: &str = r#"
api:
  base_url: http://127.0.0.1:8000
polling:
  status_interval_ms: 1500
  stop_confirm_attempts: 20
stream:
  reconnect:
    max_attempts: 5
    initial_delay_ms: 250
session:
  mode: SIMULATED
  strategy: MOMENTUM
"#;

    fn clear_env() {
        std::env::remove_var(API_URL_ENV);
        std::env::remove_var(LOG_STREAM_URL_ENV);
        std::env::remove_var(CONFIG_PATH_ENV);
    }

    #[test]
    #[serial]
    fn test_load_config_from_str_valid() {
        clear_env();
        let config = load_config_from_str(VALID_CONFIG_YAML).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.polling.status_interval_ms, 1500);
        assert_eq!(config.polling.stop_confirm_attempts, 20);
        assert_eq!(config.stream.reconnect.max_attempts, 5);
        assert_eq!(config.stream.reconnect.initial_delay_ms, 250);
        // Untouched fields keep their defaults
        assert_eq!(config.stream.reconnect.max_delay_ms, 10_000);
    }

    #[test]
    #[serial]
    fn test_load_config_from_str_invalid_yaml() {
        clear_env();
        let result = load_config_from_str("invalid: yaml: content: [");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("YAML parse error"), "Got: {}", err);
    }

    #[test]
    #[serial]
    fn test_empty_document_is_defaults() {
        clear_env();
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_config_validation_failure() {
        clear_env();
        let yaml = r#"
polling:
  stop_confirm_attempts: 0
"#;
        let err = load_config_from_str(yaml).unwrap_err().to_string();
        assert!(err.contains("stop_confirm_attempts"), "Got: {}", err);
    }

    #[test]
    #[serial]
    fn test_load_config_file_not_found() {
        clear_env();
        let result = load_config(Path::new("/nonexistent/path/config.yaml"));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Configuration file not found"), "Got: {}", err);
    }

    #[test]
    #[serial]
    fn test_load_config_from_file() {
        clear_env();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(VALID_CONFIG_YAML.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.polling.status_interval_ms, 1500);
    }

    #[test]
    #[serial]
    fn test_env_overrides_api_urls() {
        clear_env();
        std::env::set_var(API_URL_ENV, "http://10.1.1.1:9000");
        std::env::set_var(LOG_STREAM_URL_ENV, "ws://10.1.1.2:9001/ws/logs");

        let config = load_config_from_str(VALID_CONFIG_YAML).unwrap();
        assert_eq!(config.api.base_url, "http://10.1.1.1:9000");
        assert_eq!(config.api.log_stream_url(), "ws://10.1.1.2:9001/ws/logs");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_is_validated() {
        clear_env();
        std::env::set_var(API_URL_ENV, "ftp://nope");
        let result = load_config_from_str("");
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_load_default_config_missing_file_uses_defaults() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        std::env::set_var(CONFIG_PATH_ENV, &missing);

        let config = load_default_config().unwrap();
        clear_env();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_default_config_reads_env_path() {
        clear_env();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(VALID_CONFIG_YAML.as_bytes()).unwrap();
        std::env::set_var(CONFIG_PATH_ENV, file.path());

        let config = load_default_config().unwrap();
        clear_env();
        assert_eq!(config.polling.stop_confirm_attempts, 20);
    }
}
