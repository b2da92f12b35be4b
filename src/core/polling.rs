//! Fixed-interval task loop shared by every poller

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Run `tick` immediately, then every `period`, until shutdown.
///
/// A closed or lagged shutdown channel counts as shutdown. An in-progress
/// tick is abandoned when shutdown arrives.
pub async fn poll_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tick() => {}
                }
            }
        }
    }
    debug!(event_type = "POLLER", poller = name, "Poller stopped");
}
