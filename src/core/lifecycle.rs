//! Local model of the remote bot's run state
//!
//! `Lifecycle` is a plain state machine: it performs no I/O and is driven by
//! the session controller with command outcomes and status observations.
//! Start is optimistic (accepted → STARTING), stop is pessimistic (STOPPED
//! only once the bot reports it).

use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{Accepted, ClientError, ClientResult, ExecutionMode, RemoteStatus, StrategySelector};

/// Transitions kept for display and assertions
const MAX_HISTORY: usize = 32;

/// Default number of consecutive STOPPED polls tolerated while STARTING
pub const DEFAULT_STARTUP_GRACE_POLLS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl RunState {
    /// Bot believed to be (or becoming) active; mode is frozen
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Starting | RunState::Running | RunState::Stopping)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "IDLE",
            RunState::Starting => "STARTING",
            RunState::Running => "RUNNING",
            RunState::Stopping => "STOPPING",
            RunState::Stopped => "STOPPED",
            RunState::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A command the state machine refused to issue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("cannot {action} while {state}")]
    InvalidState { action: &'static str, state: RunState },

    #[error("another command is already in flight")]
    CommandInFlight,

    #[error("execution mode is locked while {0}")]
    ModeLocked(RunState),

    #[error("stop has not been requested")]
    StopNotRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Operator-facing message attached to the latest noteworthy transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Run-state machine plus the operator's start parameters
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: RunState,
    mode: ExecutionMode,
    strategy: StrategySelector,
    stop_gate_open: bool,
    command_in_flight: bool,
    startup_stopped_polls: u32,
    startup_grace_polls: u32,
    notice: Option<Notice>,
    history: VecDeque<RunState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(ExecutionMode::default(), StrategySelector::default(), DEFAULT_STARTUP_GRACE_POLLS)
    }
}

impl Lifecycle {
    pub fn new(mode: ExecutionMode, strategy: StrategySelector, startup_grace_polls: u32) -> Self {
        let mut history = VecDeque::with_capacity(MAX_HISTORY);
        history.push_back(RunState::Idle);
        Self {
            state: RunState::Idle,
            mode,
            strategy,
            stop_gate_open: false,
            command_in_flight: false,
            startup_stopped_polls: 0,
            startup_grace_polls: startup_grace_polls.max(1),
            notice: None,
            history,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn strategy(&self) -> &StrategySelector {
        &self.strategy
    }

    /// True while the stop gate waits for the operator's acknowledgement
    pub fn awaiting_stop_confirmation(&self) -> bool {
        self.stop_gate_open
    }

    pub fn command_in_flight(&self) -> bool {
        self.command_in_flight
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// States visited, oldest first (bounded)
    pub fn history(&self) -> impl Iterator<Item = RunState> + '_ {
        self.history.iter().copied()
    }

    fn transition(&mut self, to: RunState, reason: &str) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        if self.history.len() >= MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(to);
        info!(
            event_type = "RUN_STATE",
            from = %from,
            to = %to,
            reason = reason,
            "Run state changed"
        );
    }

    fn set_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notice = Some(Notice::new(level, message));
    }

    // -------------------------------------------------------------------------
    // Operator inputs
    // -------------------------------------------------------------------------

    pub fn select_mode(&mut self, mode: ExecutionMode) -> Result<(), LifecycleError> {
        if self.state.is_active() {
            return Err(LifecycleError::ModeLocked(self.state));
        }
        if self.mode != mode {
            info!(event_type = "MODE", mode = %mode, "Execution mode selected");
        }
        self.mode = mode;
        Ok(())
    }

    pub fn select_strategy(&mut self, strategy: StrategySelector) -> Result<(), LifecycleError> {
        if self.state.is_active() {
            return Err(LifecycleError::ModeLocked(self.state));
        }
        self.strategy = strategy;
        Ok(())
    }

    /// Reserve the command slot for a start; returns the frozen parameters
    pub fn begin_start(&mut self) -> Result<(ExecutionMode, StrategySelector), LifecycleError> {
        if self.command_in_flight {
            return Err(LifecycleError::CommandInFlight);
        }
        if self.state != RunState::Idle {
            return Err(LifecycleError::InvalidState {
                action: "start",
                state: self.state,
            });
        }
        self.command_in_flight = true;
        self.clear_notice();
        Ok((self.mode, self.strategy.clone()))
    }

    pub fn finish_start(&mut self, outcome: &ClientResult<Accepted>) {
        self.command_in_flight = false;
        match outcome {
            Ok(_) => {
                self.startup_stopped_polls = 0;
                self.transition(RunState::Starting, "start accepted");
            }
            Err(e) => {
                warn!(event_type = "COMMAND", command = "start", error = %e, "Start rejected");
                self.set_notice(NoticeLevel::Error, format!("Start failed: {}", e));
            }
        }
    }

    /// Open the confirmation gate; the bot is not contacted yet
    pub fn request_stop(&mut self) -> Result<(), LifecycleError> {
        if self.command_in_flight {
            return Err(LifecycleError::CommandInFlight);
        }
        if !matches!(self.state, RunState::Running | RunState::Starting) {
            return Err(LifecycleError::InvalidState {
                action: "stop",
                state: self.state,
            });
        }
        self.stop_gate_open = true;
        Ok(())
    }

    pub fn cancel_stop(&mut self) {
        if self.stop_gate_open {
            debug!(event_type = "COMMAND", command = "stop", "Stop cancelled by operator");
        }
        self.stop_gate_open = false;
    }

    /// Operator acknowledged the gate; reserve the command slot for a stop
    pub fn confirm_stop(&mut self) -> Result<(), LifecycleError> {
        if !self.stop_gate_open {
            return Err(LifecycleError::StopNotRequested);
        }
        self.stop_gate_open = false;
        if self.command_in_flight {
            return Err(LifecycleError::CommandInFlight);
        }
        // The bot may have stopped while the gate was open
        if !matches!(self.state, RunState::Running | RunState::Starting) {
            return Err(LifecycleError::InvalidState {
                action: "stop",
                state: self.state,
            });
        }
        self.command_in_flight = true;
        self.clear_notice();
        Ok(())
    }

    /// Outcome of the stop command itself. Returns true when the
    /// confirmation loop must run.
    pub fn finish_stop_command(&mut self, outcome: &ClientResult<Accepted>) -> bool {
        match outcome {
            Ok(_) if matches!(self.state, RunState::Running | RunState::Starting) => {
                self.transition(RunState::Stopping, "stop accepted");
                true
            }
            Ok(_) => {
                self.command_in_flight = false;
                warn!(
                    event_type = "COMMAND",
                    command = "stop",
                    state = %self.state,
                    "Stop accepted outside RUNNING/STARTING; ignored"
                );
                false
            }
            Err(e) => {
                self.command_in_flight = false;
                warn!(event_type = "COMMAND", command = "stop", error = %e, "Stop rejected");
                self.set_notice(NoticeLevel::Error, format!("Stop failed: {}", e));
                false
            }
        }
    }

    /// Outcome of the bounded stop-confirmation loop
    pub fn finish_stop_confirmation(&mut self, outcome: &ClientResult<u32>) {
        if self.state != RunState::Stopping {
            return;
        }
        self.command_in_flight = false;
        match outcome {
            Ok(attempt) => {
                info!(event_type = "COMMAND", command = "stop", attempt = *attempt, "Stop confirmed by bot");
                self.transition(RunState::Stopped, "remote reported STOPPED");
                self.transition(RunState::Idle, "stop complete");
                self.set_notice(NoticeLevel::Info, "Bot stopped");
            }
            Err(e) => {
                warn!(event_type = "COMMAND", command = "stop", error = %e, "Stop not confirmed");
                self.transition(RunState::Error, "stop not confirmed");
                self.set_notice(
                    NoticeLevel::Error,
                    "Stop was not confirmed; the bot may still be running. Check it manually, then reset.",
                );
            }
        }
    }

    // -------------------------------------------------------------------------
    // Remote observations
    // -------------------------------------------------------------------------

    /// Initial load: RUNNING if the bot says so, IDLE otherwise
    pub fn seed(&mut self, observed: &ClientResult<RemoteStatus>) {
        match observed {
            Ok(RemoteStatus::Running) => self.transition(RunState::Running, "initial status RUNNING"),
            Ok(_) => self.transition(RunState::Idle, "initial status not running"),
            Err(e) => {
                self.transition(RunState::Idle, "initial status unavailable");
                self.set_notice(NoticeLevel::Warning, format!("Bot status unavailable: {}", e));
            }
        }
    }

    /// Leave ERROR after the operator checked the bot by hand
    pub fn reset(&mut self, observed: &ClientResult<RemoteStatus>) -> Result<(), LifecycleError> {
        if self.state != RunState::Error {
            return Err(LifecycleError::InvalidState {
                action: "reset",
                state: self.state,
            });
        }
        self.command_in_flight = false;
        self.stop_gate_open = false;
        self.clear_notice();
        self.seed(observed);
        Ok(())
    }

    /// Feed one periodic status observation
    pub fn observe_status(&mut self, observed: RemoteStatus) {
        // A stop is on the wire; only the confirmation loop decides STOPPED
        if self.command_in_flight && matches!(self.state, RunState::Running | RunState::Starting) {
            debug!(event_type = "STATUS_POLL", status = %observed, "Observation ignored while stop in flight");
            return;
        }
        match (self.state, observed) {
            // Confirmation loop owns STOPPING; ERROR waits for an operator
            (RunState::Stopping, _) | (RunState::Error, _) | (_, RemoteStatus::Unknown) => {}
            (RunState::Starting, RemoteStatus::Running) => {
                self.startup_stopped_polls = 0;
                self.transition(RunState::Running, "remote reported RUNNING");
            }
            (RunState::Starting, RemoteStatus::Stopped) => {
                self.startup_stopped_polls += 1;
                if self.startup_stopped_polls >= self.startup_grace_polls {
                    self.startup_stopped_polls = 0;
                    self.stop_gate_open = false;
                    self.transition(RunState::Idle, "bot exited during startup");
                    self.set_notice(NoticeLevel::Warning, "Bot exited during startup");
                }
            }
            (RunState::Running, RemoteStatus::Stopped) => {
                self.stop_gate_open = false;
                self.transition(RunState::Idle, "remote reported STOPPED");
                self.set_notice(NoticeLevel::Info, "Bot stopped on its own");
            }
            (RunState::Idle, RemoteStatus::Running) if !self.command_in_flight => {
                self.transition(RunState::Running, "bot started elsewhere");
                self.set_notice(NoticeLevel::Info, "Bot is running (started elsewhere)");
            }
            _ => {}
        }
    }

    /// A failed status fetch is "unknown", never "stopped"
    pub fn observe_status_failure(&self, error: &ClientError) {
        debug!(event_type = "STATUS_POLL", state = %self.state, error = %error, "Status unavailable");
    }
}
