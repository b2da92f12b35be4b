//! botctl - one-shot commands against the remote bot
//!
//! ```bash
//! botctl status
//! botctl start --strategy MOMENTUM          # simulated
//! botctl start --live --wait
//! botctl stop                               # asks for confirmation
//! botctl stop --yes
//! botctl logs                               # follow the log stream
//! ```

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::info;

use bot_console::api::{BotApi, ExecutionMode, HttpBotApi, StrategySelector};
use bot_console::config::{init_logging, load_default_config, AppConfig};
use bot_console::core::{LogEvent, LogStreamClient, RunState, SessionConfig, SessionController};

/// Status polls allowed while waiting for a start to be observed
const MAX_START_WAIT_POLLS: u32 = 30;

#[derive(Parser)]
#[command(name = "botctl", about = "Start, stop and inspect the trading bot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the bot's run status
    Status,
    /// Start the bot (simulated unless --live)
    Start {
        /// Trade with real capital
        #[arg(long)]
        live: bool,
        /// Strategy name passed to the bot
        #[arg(long)]
        strategy: Option<String>,
        /// Wait until the bot reports RUNNING
        #[arg(long)]
        wait: bool,
    },
    /// Stop the bot and wait until it confirms
    Stop {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Follow the bot's log stream until Ctrl+C
    Logs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = load_default_config()?;
    let api: Arc<dyn BotApi> = Arc::new(HttpBotApi::new(config.api.base_url.clone()));
    let session = SessionController::new(
        Arc::clone(&api),
        SessionConfig::from(&config.polling),
        &config.session,
    );

    match cli.command {
        Command::Status => status(&api).await,
        Command::Start {
            live,
            strategy,
            wait,
        } => start(&session, live, strategy, wait).await,
        Command::Stop { yes } => stop(&session, yes).await,
        Command::Logs => logs(&config).await,
    }
}

async fn status(api: &Arc<dyn BotApi>) -> anyhow::Result<()> {
    let status = api.fetch_status().await.context("could not read bot status")?;
    println!("{}", status);
    Ok(())
}

async fn start(
    session: &SessionController,
    live: bool,
    strategy: Option<String>,
    wait: bool,
) -> anyhow::Result<()> {
    let state = session.seed().await;
    if state != RunState::Idle {
        bail!("bot is already {}", state);
    }

    let mode = if live {
        ExecutionMode::Live
    } else {
        ExecutionMode::Simulated
    };
    session.select_mode(mode).await?;
    if let Some(name) = strategy {
        session.select_strategy(StrategySelector::new(name)).await?;
    }

    let accepted = session.start().await?;
    let snapshot = session.snapshot().await;
    println!(
        "Start accepted ({} / {}){}",
        snapshot.mode(),
        snapshot.strategy(),
        accepted
            .message
            .map(|m| format!(": {}", m))
            .unwrap_or_default()
    );

    if !wait {
        return Ok(());
    }

    let period = session.config().status_interval;
    for _ in 0..MAX_START_WAIT_POLLS {
        tokio::time::sleep(period).await;
        session.poll_status_once().await;
        match session.run_state().await {
            RunState::Running => {
                println!("RUNNING");
                return Ok(());
            }
            RunState::Starting => continue,
            other => {
                let reason = session
                    .snapshot()
                    .await
                    .notice()
                    .map(|n| n.message.clone())
                    .unwrap_or_default();
                bail!("bot did not start ({}): {}", other, reason);
            }
        }
    }
    bail!("bot not observed RUNNING after {} polls", MAX_START_WAIT_POLLS)
}

async fn stop(session: &SessionController, yes: bool) -> anyhow::Result<()> {
    let state = session.seed().await;
    if !matches!(state, RunState::Running | RunState::Starting) {
        println!("Bot is not running");
        return Ok(());
    }

    session.request_stop().await?;
    if !yes && !confirm_on_stdin()? {
        session.cancel_stop().await;
        println!("Stop cancelled");
        return Ok(());
    }

    let attempts = session.config().stop_confirm_attempts;
    info!(event_type = "COMMAND", command = "stop", attempts, "Waiting for stop confirmation");
    match session.confirm_stop().await? {
        RunState::Error => bail!(
            "bot did not report STOPPED after {} checks; it may still be running",
            attempts
        ),
        state => {
            println!("{}", state);
            Ok(())
        }
    }
}

fn confirm_on_stdin() -> anyhow::Result<bool> {
    let mut stderr = io::stderr();
    write!(
        stderr,
        "Open positions will NOT be closed automatically.\nType 'yes' to stop the bot: "
    )?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

async fn logs(config: &AppConfig) -> anyhow::Result<()> {
    let stream = LogStreamClient::new(config.api.log_stream_url(), config.stream.reconnect.clone());
    let mut events = stream.subscribe();
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let handle = stream.spawn(shutdown_tx.subscribe());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("... {} events skipped", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    Ok(())
}

fn print_event(event: &LogEvent) {
    println!("{} {:7} {}", event.timestamp, event.level.as_str(), event.message);
}
