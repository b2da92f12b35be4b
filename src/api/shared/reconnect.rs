//! Reconnection logic with exponential backoff
//!
//! Implements bounded exponential backoff with jitter so a dead bot endpoint
//! is not hammered and a persistently unreachable one is eventually given up on.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::errors::{ClientError, ClientResult};

/// Configuration for reconnection attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts before giving up
    pub max_attempts: u32,
    /// Initial delay in milliseconds (doubles each attempt)
    pub initial_delay_ms: u64,
    /// Maximum delay cap in milliseconds
    pub max_delay_ms: u64,
    /// Upper bound (exclusive) of the random jitter added to each delay
    pub jitter_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter_ms: 200,
        }
    }
}

/// Delay before reconnect attempt `attempt` (0-based), jitter included
///
/// `min(initial * 2^attempt, max) + rand(0..jitter)`
pub fn backoff_delay(config: &ReconnectConfig, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let base = config
        .initial_delay_ms
        .saturating_mul(factor)
        .min(config.max_delay_ms);
    let jitter = if config.jitter_ms > 0 {
        rand::random::<u64>() % config.jitter_ms
    } else {
        0
    };
    Duration::from_millis(base + jitter)
}

/// Reconnect with exponential backoff and jitter
///
/// Sleeps [`backoff_delay`] before every attempt, then calls `connect_fn`
/// with the 0-based attempt number. Returns the first successful connection,
/// or the last error once `max_attempts` is exhausted.
///
/// # Example
/// ```ignore
/// let stream = reconnect_with_backoff(&config, "log-stream", |_| connect_ws(&url)).await?;
/// ```
pub async fn reconnect_with_backoff<T, F, Fut>(
    config: &ReconnectConfig,
    name: &str,
    mut connect_fn: F,
) -> ClientResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = ClientResult<T>>,
{
    let mut last_error: Option<ClientError> = None;

    for attempt in 0..config.max_attempts {
        let delay = backoff_delay(config, attempt);

        tracing::info!(
            "{}: Reconnect attempt {} of {}, waiting {}ms...",
            name,
            attempt + 1,
            config.max_attempts,
            delay.as_millis()
        );

        tokio::time::sleep(delay).await;

        match connect_fn(attempt).await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                tracing::warn!("{}: Reconnect attempt {} failed: {}", name, attempt + 1, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ClientError::Transport("Reconnection failed after max attempts".into())
    }))
}
