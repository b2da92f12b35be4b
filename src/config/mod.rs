//! Configuration module for console settings and YAML loading
//!
//! This module provides:
//! - Configuration types (`AppConfig` and its sections)
//! - YAML loading functionality (`load_config`, `load_default_config`)
//! - Logging configuration (`init_logging`)

mod loader;
pub mod logging;
mod types;

// Re-export types
pub use types::{
    ApiConfig, AppConfig, PollingConfig, SessionDefaults, StreamConfig, DEFAULT_BASE_URL,
    LOG_STREAM_PATH,
};

// Re-export loader functions
pub use loader::{
    apply_env_overrides, load_config, load_config_from_str, load_default_config,
    API_URL_ENV, CONFIG_PATH_ENV, LOG_STREAM_URL_ENV,
};

// Re-export logging functions
pub use logging::init_logging;
