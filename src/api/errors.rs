//! Remote bot API error types
//!
//! Every failure talking to the remote bot is classified into one of the
//! variants below so callers can decide whether to surface, retry or drop it.

use thiserror::Error;

/// Errors produced by the control, status, telemetry and log-stream clients
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or connection failure (request never got an answer)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote answered and explicitly reported a failure
    #[error("Rejected by bot: {0}")]
    Application(String),

    /// The remote answered with a payload we could not decode
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A bounded retry loop ran out of attempts
    #[error("Timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// WebSocket protocol error (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
}

impl ClientError {
    /// True for failures where the request may never have reached the bot
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::WebSocket(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Protocol(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(err))
    }
}

/// Result type alias for remote API operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display() {
        let err = ClientError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
        assert!(err.is_transport());
    }

    #[test]
    fn test_application_display() {
        let err = ClientError::Application("Bot is already running.".to_string());
        assert_eq!(err.to_string(), "Rejected by bot: Bot is already running.");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_timeout_display() {
        let err = ClientError::Timeout { attempts: 30 };
        assert_eq!(err.to_string(), "Timed out after 30 attempts");
    }

    #[test]
    fn test_websocket_error_is_transport() {
        let err: ClientError = tokio_tungstenite::tungstenite::Error::ConnectionClosed.into();
        assert!(err.is_transport());
        assert!(err.to_string().starts_with("WebSocket error"));
    }
}
