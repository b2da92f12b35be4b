//! Remote status polling
//!
//! Two consumers: the periodic poll feeding the lifecycle, and the bounded
//! stop-confirmation loop that runs after a stop is accepted.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::{BotApi, ClientError, ClientResult, RemoteStatus};

use super::polling::poll_loop;
use super::session::SessionController;

/// Poll status until the bot reports STOPPED.
///
/// Waits `period` before each of up to `max_attempts` polls. A failed fetch
/// consumes an attempt. Returns the attempt that saw STOPPED, or
/// `ClientError::Timeout` when the budget is exhausted.
pub async fn confirm_stopped(
    api: &dyn BotApi,
    max_attempts: u32,
    period: Duration,
) -> ClientResult<u32> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately; the bot gets one period to react
    ticker.tick().await;

    for attempt in 1..=max_attempts {
        ticker.tick().await;
        match api.fetch_status().await {
            Ok(RemoteStatus::Stopped) => return Ok(attempt),
            Ok(status) => {
                debug!(event_type = "STOP_CONFIRM", attempt, status = %status, "Bot not stopped yet");
            }
            Err(e) => {
                warn!(event_type = "STOP_CONFIRM", attempt, error = %e, "Status unavailable during stop confirmation");
            }
        }
    }

    Err(ClientError::Timeout {
        attempts: max_attempts,
    })
}

/// Periodic status poll feeding `controller` until shutdown
pub async fn status_poll_task(
    controller: SessionController,
    period: Duration,
    shutdown_rx: broadcast::Receiver<()>,
) {
    poll_loop("status", period, shutdown_rx, || {
        let controller = controller.clone();
        async move { controller.poll_status_once().await }
    })
    .await;
}
