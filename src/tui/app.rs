//! TUI application state
//!
//! `ConsoleState` holds presentation-only state and the console's own
//! diagnostics (written by [`super::TuiLayer`]). `Dashboard` ties it to the
//! session, the log stream and telemetry, and applies operator actions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, warn};

use crate::core::{
    ConnectionState, Lifecycle, LogEvent, LogStreamClient, RunState, SessionController,
    SessionError, SharedTelemetry, TelemetryState,
};

use super::event::UserAction;

/// Maximum number of console diagnostics kept in memory
pub const MAX_CONSOLE_ENTRIES: usize = 50;

/// One diagnostic emitted by the console itself
#[derive(Clone, Debug, PartialEq)]
pub struct ConsoleEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

/// Presentation state shared between the draw loop and the tracing layer
#[derive(Debug)]
pub struct ConsoleState {
    pub console_log: VecDeque<ConsoleEntry>,
    pub dropped_logs_count: u64,
    pub should_quit: bool,
    pub log_scroll_offset: usize,
    pub show_debug_logs: bool,
    pub uptime_start: Instant,
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleState {
    pub fn new() -> Self {
        Self {
            console_log: VecDeque::with_capacity(MAX_CONSOLE_ENTRIES),
            dropped_logs_count: 0,
            should_quit: false,
            log_scroll_offset: 0,
            show_debug_logs: false,
            uptime_start: Instant::now(),
        }
    }

    /// Add a diagnostic with automatic rotation
    pub fn push_console(&mut self, entry: ConsoleEntry) {
        if self.console_log.len() >= MAX_CONSOLE_ENTRIES {
            self.console_log.pop_front();
        }
        self.console_log.push_back(entry);
    }

    /// Scroll toward older log events, bounded by `available`
    pub fn scroll_up(&mut self, available: usize) {
        let max_offset = available.saturating_sub(1);
        if self.log_scroll_offset < max_offset {
            self.log_scroll_offset += 1;
        }
    }

    pub fn scroll_down(&mut self) {
        self.log_scroll_offset = self.log_scroll_offset.saturating_sub(1);
    }

    pub fn toggle_debug(&mut self) -> bool {
        self.show_debug_logs = !self.show_debug_logs;
        self.show_debug_logs
    }

    /// Get formatted uptime string
    pub fn uptime_str(&self) -> String {
        let elapsed = self.uptime_start.elapsed();
        let hours = elapsed.as_secs() / 3600;
        let minutes = (elapsed.as_secs() % 3600) / 60;
        format!("{}h{:02}m", hours, minutes)
    }
}

/// Everything one frame needs, captured without holding any lock
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub lifecycle: Lifecycle,
    pub stream_state: ConnectionState,
    pub logs: Vec<LogEvent>,
    pub telemetry: TelemetryState,
    pub latest_console: Option<ConsoleEntry>,
    pub dropped_logs_count: u64,
    pub log_scroll_offset: usize,
    pub show_debug_logs: bool,
    pub uptime: String,
}

/// Session-scoped wiring behind the dashboard
pub struct Dashboard {
    pub session: SessionController,
    pub stream: LogStreamClient,
    pub telemetry: SharedTelemetry,
    pub console: Arc<Mutex<ConsoleState>>,
    commands: Vec<AbortOnDropHandle<()>>,
}

impl Dashboard {
    pub fn new(
        session: SessionController,
        stream: LogStreamClient,
        telemetry: SharedTelemetry,
        console: Arc<Mutex<ConsoleState>>,
    ) -> Self {
        Self {
            session,
            stream,
            telemetry,
            console,
            commands: Vec::new(),
        }
    }

    pub async fn view(&self) -> DashboardView {
        let lifecycle = self.session.snapshot().await;
        let logs = self.stream.buffer().read().await.to_vec();
        let telemetry = self.telemetry.read().await.clone();

        let (latest_console, dropped_logs_count, log_scroll_offset, show_debug_logs, uptime) =
            match self.console.lock() {
                Ok(console) => (
                    console.console_log.back().cloned(),
                    console.dropped_logs_count,
                    console.log_scroll_offset,
                    console.show_debug_logs,
                    console.uptime_str(),
                ),
                Err(_) => (None, 0, 0, false, String::new()),
            };

        DashboardView {
            lifecycle,
            stream_state: self.stream.state(),
            logs,
            telemetry,
            latest_console,
            dropped_logs_count,
            log_scroll_offset,
            show_debug_logs,
            uptime,
        }
    }

    /// Commands still running in the background
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Apply one operator action. Returns false when the operator quits.
    pub async fn handle(&mut self, action: UserAction) -> bool {
        self.commands.retain(|handle| !handle.is_finished());

        match action {
            UserAction::Quit => {
                if let Ok(mut console) = self.console.lock() {
                    console.should_quit = true;
                }
                return false;
            }
            UserAction::ToggleMode => {
                let mode = self.session.snapshot().await.mode().toggled();
                if let Err(e) = self.session.select_mode(mode).await {
                    warn!(event_type = "COMMAND", error = %e, "Mode change refused");
                }
            }
            UserAction::Start => {
                let session = self.session.clone();
                self.commands.push(AbortOnDropHandle::new(tokio::spawn(async move {
                    // Rejections are already surfaced by the lifecycle
                    if let Err(SessionError::Refused(e)) = session.start().await {
                        warn!(event_type = "COMMAND", command = "start", error = %e, "Start refused");
                    }
                })));
            }
            UserAction::RequestStop => {
                if let Err(e) = self.session.request_stop().await {
                    warn!(event_type = "COMMAND", command = "stop", error = %e, "Stop refused");
                }
            }
            UserAction::ConfirmStop => {
                self.commands.push(self.session.spawn_confirm_stop());
            }
            UserAction::CancelStop => self.session.cancel_stop().await,
            UserAction::Reset => self.reset_or_reconnect().await,
            UserAction::ScrollUp => {
                let available = self.stream.buffer().read().await.len();
                if let Ok(mut console) = self.console.lock() {
                    console.scroll_up(available);
                }
            }
            UserAction::ScrollDown => {
                if let Ok(mut console) = self.console.lock() {
                    console.scroll_down();
                }
            }
            UserAction::ToggleDebug => {
                if let Ok(mut console) = self.console.lock() {
                    let enabled = console.toggle_debug();
                    super::logging::set_show_debug(enabled);
                }
            }
        }
        true
    }

    /// `r`: leave ERROR if the session is stuck there, otherwise revive a
    /// FAILED log stream
    async fn reset_or_reconnect(&mut self) {
        if self.session.run_state().await == RunState::Error {
            let session = self.session.clone();
            self.commands.push(AbortOnDropHandle::new(tokio::spawn(async move {
                match session.reset().await {
                    Ok(state) => info!(event_type = "COMMAND", command = "reset", state = %state, "Session reset"),
                    Err(e) => warn!(event_type = "COMMAND", command = "reset", error = %e, "Reset refused"),
                }
            })));
        } else if self.stream.request_reconnect() {
            info!(event_type = "LOG_STREAM", "Manual reconnect requested");
        } else {
            debug!(event_type = "COMMAND", "Nothing to reset");
        }
    }
}
