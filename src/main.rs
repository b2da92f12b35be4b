//! Bot Console - terminal dashboard entry point
//!
//! Orchestrates:
//! 1. Config + TUI log capture
//! 2. Session seed from the bot's live status
//! 3. Status poller, log stream and telemetry tasks
//! 4. Draw/input loop until the operator quits
//! 5. Graceful shutdown (log stream close frame), terminal restore

use std::io::{self, Stdout};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::EventStream;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::prelude::*;

use bot_console::api::{BotApi, HttpBotApi};
use bot_console::config::{load_default_config, logging::env_filter};
use bot_console::core::{LogStreamClient, SessionConfig, SessionController, TelemetryConfig, TelemetryPoller};
use bot_console::tui::{next_action, ui, ConsoleState, Dashboard, TuiLayer};

/// Time allowed for the log stream to send its close frame
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Restores the terminal when dropped, whatever the exit path
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // =========================================================================
    // 1. Config + logging
    // =========================================================================
    dotenvy::dotenv().ok();

    let console = Arc::new(Mutex::new(ConsoleState::new()));
    tracing_subscriber::registry()
        .with(env_filter())
        .with(TuiLayer::new(Arc::clone(&console)))
        .init();

    let config = load_default_config()?;
    info!(
        event_type = "CONFIG",
        api = %config.api.base_url,
        log_stream = %config.api.log_stream_url(),
        "Configuration loaded"
    );

    // =========================================================================
    // 2. Session
    // =========================================================================
    let api: Arc<dyn BotApi> = Arc::new(HttpBotApi::new(config.api.base_url.clone()));
    let session = SessionController::new(
        Arc::clone(&api),
        SessionConfig::from(&config.polling),
        &config.session,
    );
    session.seed().await;

    // =========================================================================
    // 3. Background tasks
    // =========================================================================
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let stream = LogStreamClient::new(config.api.log_stream_url(), config.stream.reconnect.clone());
    let stream_handle = stream.spawn(shutdown_tx.subscribe());
    let _status_handle = session.spawn_status_poller(shutdown_tx.subscribe());

    let telemetry = TelemetryPoller::new(Arc::clone(&api), TelemetryConfig::from(&config.polling));
    let _telemetry_handles = telemetry.spawn(&shutdown_tx);

    let mut dashboard = Dashboard::new(session, stream, telemetry.state(), Arc::clone(&console));

    // =========================================================================
    // 4. Terminal + event loop
    // =========================================================================
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    enable_raw_mode()?;
    let guard = TerminalGuard;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut dashboard).await;

    drop(guard);
    terminal.show_cursor()?;

    // =========================================================================
    // 5. Shutdown
    // =========================================================================
    let _ = shutdown_tx.send(());
    // Timing out drops the handle, which aborts the task
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, stream_handle).await;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    dashboard: &mut Dashboard,
) -> anyhow::Result<()> {
    let mut events = EventStream::new();
    loop {
        let view = dashboard.view().await;
        terminal.draw(|f| ui::draw(f, &view))?;

        if let Some(action) =
            next_action(&mut events, view.lifecycle.awaiting_stop_confirmation()).await
        {
            if !dashboard.handle(action).await {
                break;
            }
        }
    }
    Ok(())
}
