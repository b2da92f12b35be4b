//! Bounded, ordered window of log events pushed by the bot
//!
//! Events keep arrival order; when full the oldest entry is evicted.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::api::{ClientError, ClientResult};

/// Maximum number of log events kept in memory
pub const MAX_LOG_EVENTS: usize = 100;

/// Severity of a [`LogEvent`]
///
/// `System` is reserved for events the console synthesizes about the stream
/// itself (connected, lost, giving up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    System,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" | "DEBUG" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" | "CRITICAL" => Ok(LogLevel::Error),
            "SYSTEM" => Ok(LogLevel::System),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single entry of the bot's log stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Display-formatted time, as sent by the bot
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        }
    }

    /// Synthetic event describing the stream itself
    pub fn system(message: impl Into<String>) -> Self {
        Self::new(LogLevel::System, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

/// Decode one stream payload.
///
/// Every field is required and the level must be a known name; anything
/// else is a protocol error.
pub fn decode_log_event(payload: &str) -> ClientResult<LogEvent> {
    serde_json::from_str(payload)
        .map_err(|e| ClientError::Protocol(format!("malformed log event: {}", e)))
}

/// Append-only ring of [`LogEvent`]s, bounded to [`MAX_LOG_EVENTS`]
#[derive(Debug, Clone)]
pub struct LogBuffer {
    events: VecDeque<LogEvent>,
    evicted: u64,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBuffer {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(MAX_LOG_EVENTS),
            evicted: 0,
        }
    }

    /// Add an event with automatic rotation
    pub fn push(&mut self, event: LogEvent) {
        if self.events.len() >= MAX_LOG_EVENTS {
            self.events.pop_front();
            self.evicted += 1;
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&LogEvent> {
        self.events.back()
    }

    /// Events rotated out since creation
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn to_vec(&self) -> Vec<LogEvent> {
        self.events.iter().cloned().collect()
    }
}

/// Buffer shared between the stream task (writer) and presentation (readers)
pub type SharedLogBuffer = Arc<RwLock<LogBuffer>>;

pub fn shared_log_buffer() -> SharedLogBuffer {
    Arc::new(RwLock::new(LogBuffer::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn event(i: usize) -> LogEvent {
        LogEvent {
            timestamp: "2024-04-01 09:15:00".to_string(),
            level: LogLevel::Info,
            message: format!("Log {}", i),
        }
    }

    #[test]
    fn test_log_rotation() {
        let mut buffer = LogBuffer::new();
        for i in 0..150 {
            buffer.push(event(i));
        }

        assert_eq!(buffer.len(), MAX_LOG_EVENTS);
        assert_eq!(buffer.evicted(), 50);
        assert_eq!(buffer.iter().next().unwrap().message, "Log 50");
        assert_eq!(buffer.latest().unwrap().message, "Log 149");
    }

    #[test]
    fn test_decode_python_payload() {
        let ev = decode_log_event(
            r#"{"timestamp":"2024-04-01 09:15:02","level":"INFO","message":"Strategy armed"}"#,
        )
        .unwrap();
        assert_eq!(ev.level, LogLevel::Info);
        assert_eq!(ev.timestamp, "2024-04-01 09:15:02");
        assert_eq!(ev.message, "Strategy armed");
    }

    #[test]
    fn test_level_aliases_case_insensitive() {
        let cases = [
            ("warn", LogLevel::Warning),
            ("Warning", LogLevel::Warning),
            ("CRITICAL", LogLevel::Error),
            ("error", LogLevel::Error),
            ("debug", LogLevel::Info),
            ("system", LogLevel::System),
        ];
        for (raw, expected) in cases {
            assert_eq!(raw.parse::<LogLevel>().unwrap(), expected, "level {}", raw);
        }
    }

    #[test]
    fn test_level_try_from_owned_string() {
        assert_eq!(LogLevel::try_from("Error".to_string()), Ok(LogLevel::Error));
        let err = LogLevel::try_from("TRACE".to_string()).unwrap_err();
        assert!(err.contains("TRACE"));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let bad = [
            "not json",
            r#"{"timestamp":"t","level":"INFO"}"#,
            r#"{"timestamp":"t","level":"TRACE","message":"m"}"#,
            r#"{"timestamp":"t","level":"INFO","message":42}"#,
            r#"[1,2,3]"#,
        ];
        for payload in bad {
            let err = decode_log_event(payload).unwrap_err();
            assert!(matches!(err, ClientError::Protocol(_)), "payload {}", payload);
        }
    }

    #[test]
    fn test_level_serializes_canonical_name() {
        let ev = LogEvent {
            timestamp: "t".into(),
            level: "warn".parse().unwrap(),
            message: "m".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["level"], "WARNING");
    }

    #[test]
    fn test_synthetic_events() {
        let ev = LogEvent::system("Connected");
        assert_eq!(ev.level, LogLevel::System);
        assert_eq!(ev.timestamp.len(), 8);
        assert_eq!(LogEvent::error("boom").level, LogLevel::Error);
    }

    proptest! {
        #[test]
        fn prop_buffer_keeps_last_events_in_order(count in 0usize..400) {
            let mut buffer = LogBuffer::new();
            for i in 0..count {
                buffer.push(event(i));
            }
            prop_assert!(buffer.len() <= MAX_LOG_EVENTS);
            prop_assert_eq!(buffer.len(), count.min(MAX_LOG_EVENTS));

            let first = count.saturating_sub(MAX_LOG_EVENTS);
            let expected: Vec<String> = (first..count).map(|i| format!("Log {}", i)).collect();
            let actual: Vec<String> = buffer.iter().map(|e| e.message.clone()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
