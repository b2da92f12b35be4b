//! Session-scoped owner of the run state
//!
//! `SessionController` is the only writer of [`Lifecycle`]. It issues
//! commands through the [`BotApi`] seam and feeds outcomes back into the
//! state machine. Locks are never held across network calls.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio_util::task::AbortOnDropHandle;
use tracing::{info, warn};

use crate::api::{Accepted, BotApi, ClientError, ExecutionMode, StrategySelector};
use crate::config::{PollingConfig, SessionDefaults};

use super::lifecycle::{Lifecycle, LifecycleError, RunState};
use super::status_poller::{confirm_stopped, status_poll_task};

/// Why a command did not go through
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Refused(#[from] LifecycleError),

    #[error(transparent)]
    Rejected(#[from] ClientError),
}

/// Timing of the session's status traffic
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub status_interval: Duration,
    pub stop_confirm_attempts: u32,
    pub stop_confirm_interval: Duration,
    pub startup_grace_polls: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for SessionConfig {
    fn from(polling: &PollingConfig) -> Self {
        Self {
            status_interval: polling.status_interval(),
            stop_confirm_attempts: polling.stop_confirm_attempts,
            stop_confirm_interval: polling.stop_confirm_interval(),
            startup_grace_polls: polling.startup_grace_polls,
        }
    }
}

struct SessionInner {
    api: Arc<dyn BotApi>,
    lifecycle: RwLock<Lifecycle>,
    config: SessionConfig,
}

/// Cheap-to-clone handle on the session
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    pub fn new(api: Arc<dyn BotApi>, config: SessionConfig, defaults: &SessionDefaults) -> Self {
        let lifecycle = Lifecycle::new(
            defaults.mode,
            defaults.strategy.clone(),
            config.startup_grace_polls,
        );
        Self {
            inner: Arc::new(SessionInner {
                api,
                lifecycle: RwLock::new(lifecycle),
                config,
            }),
        }
    }

    pub fn api(&self) -> &Arc<dyn BotApi> {
        &self.inner.api
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Point-in-time copy for rendering
    pub async fn snapshot(&self) -> Lifecycle {
        self.inner.lifecycle.read().await.clone()
    }

    pub async fn run_state(&self) -> RunState {
        self.inner.lifecycle.read().await.state()
    }

    /// Initial load: one status query decides IDLE or RUNNING
    pub async fn seed(&self) -> RunState {
        let observed = self.inner.api.fetch_status().await;
        let mut lifecycle = self.inner.lifecycle.write().await;
        lifecycle.seed(&observed);
        lifecycle.state()
    }

    pub async fn select_mode(&self, mode: ExecutionMode) -> Result<(), LifecycleError> {
        self.inner.lifecycle.write().await.select_mode(mode)
    }

    pub async fn select_strategy(&self, strategy: StrategySelector) -> Result<(), LifecycleError> {
        self.inner.lifecycle.write().await.select_strategy(strategy)
    }

    /// Issue a start. On acceptance the state is STARTING; RUNNING follows
    /// only once a poll observes it.
    pub async fn start(&self) -> Result<Accepted, SessionError> {
        let (mode, strategy) = self.inner.lifecycle.write().await.begin_start()?;
        info!(
            event_type = "COMMAND",
            command = "start",
            mode = %mode,
            strategy = %strategy,
            "Sending start"
        );

        let outcome = self.inner.api.start(mode, &strategy).await;
        self.inner.lifecycle.write().await.finish_start(&outcome);
        Ok(outcome?)
    }

    /// Open the confirmation gate
    pub async fn request_stop(&self) -> Result<(), LifecycleError> {
        self.inner.lifecycle.write().await.request_stop()
    }

    pub async fn cancel_stop(&self) {
        self.inner.lifecycle.write().await.cancel_stop();
    }

    /// Full stop protocol after the operator acknowledged the gate:
    /// send stop, then poll until STOPPED or the attempt budget runs out.
    /// Returns the final run state (IDLE on success, ERROR on timeout).
    pub async fn confirm_stop(&self) -> Result<RunState, SessionError> {
        self.inner.lifecycle.write().await.confirm_stop()?;
        info!(event_type = "COMMAND", command = "stop", "Sending stop");

        let outcome = self.inner.api.stop().await;
        let must_confirm = self.inner.lifecycle.write().await.finish_stop_command(&outcome);
        if !must_confirm {
            outcome?;
            return Ok(self.run_state().await);
        }

        let config = &self.inner.config;
        let confirmed = confirm_stopped(
            self.inner.api.as_ref(),
            config.stop_confirm_attempts,
            config.stop_confirm_interval,
        )
        .await;

        let mut lifecycle = self.inner.lifecycle.write().await;
        lifecycle.finish_stop_confirmation(&confirmed);
        Ok(lifecycle.state())
    }

    /// Run [`Self::confirm_stop`] on its own task so callers never block on
    /// the confirmation loop. Dropping the handle aborts it.
    pub fn spawn_confirm_stop(&self) -> AbortOnDropHandle<()> {
        let controller = self.clone();
        AbortOnDropHandle::new(tokio::spawn(async move {
            if let Err(e) = controller.confirm_stop().await {
                warn!(event_type = "COMMAND", command = "stop", error = %e, "Stop did not go through");
            }
        }))
    }

    /// Leave ERROR by re-reading the bot's status
    pub async fn reset(&self) -> Result<RunState, LifecycleError> {
        let state = self.run_state().await;
        if state != RunState::Error {
            return Err(LifecycleError::InvalidState {
                action: "reset",
                state,
            });
        }
        let observed = self.inner.api.fetch_status().await;
        let mut lifecycle = self.inner.lifecycle.write().await;
        lifecycle.reset(&observed)?;
        Ok(lifecycle.state())
    }

    /// One periodic poll. Failures leave the state untouched.
    pub async fn poll_status_once(&self) {
        match self.inner.api.fetch_status().await {
            Ok(status) => self.inner.lifecycle.write().await.observe_status(status),
            Err(e) => self.inner.lifecycle.read().await.observe_status_failure(&e),
        }
    }

    /// Spawn the periodic status poller
    pub fn spawn_status_poller(&self, shutdown_rx: broadcast::Receiver<()>) -> AbortOnDropHandle<()> {
        let period = self.inner.config.status_interval;
        AbortOnDropHandle::new(tokio::spawn(status_poll_task(self.clone(), period, shutdown_rx)))
    }
}
