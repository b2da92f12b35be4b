//! Logging configuration for the console binaries
//!
//! # Environment Variables
//! - `LOG_FORMAT`: Output format - `json` (default) or `pretty`
//! - `RUST_LOG`: Log level filter (default: `info`)
//!
//! The dashboard does not call `init_logging()`: it installs
//! [`crate::tui::TuiLayer`] so its own diagnostics land in the notice pane
//! instead of on the alternate screen.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Output format selected by `LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything other than `pretty` falls back to JSON
    pub fn parse(value: &str) -> Self {
        match value {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|v| Self::parse(&v))
            .unwrap_or(LogFormat::Json)
    }
}

/// Filter from `RUST_LOG`, or [`DEFAULT_LOG_FILTER`]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Initialize logging with configurable format
///
/// Also respects `RUST_LOG` for log level filtering (default: `info`).
/// Writes to stderr so command output on stdout stays parseable.
pub fn init_logging() {
    let env_filter = env_filter();

    match LogFormat::from_env() {
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .pretty()
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    // init_logging() itself is not unit tested: a global subscriber can only
    // be installed once per process.
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        let test_cases = vec![
            ("pretty", LogFormat::Pretty),
            ("json", LogFormat::Json),
            ("PRETTY", LogFormat::Json), // Case sensitive
            ("", LogFormat::Json),
            ("tui", LogFormat::Json),
        ];

        for (input, expected) in test_cases {
            assert_eq!(LogFormat::parse(input), expected, "Failed for input: {}", input);
        }
    }

    #[test]
    fn test_env_filter_fallback() {
        let filter = env_filter();
        assert!(!format!("{:?}", filter).is_empty());
    }
}
