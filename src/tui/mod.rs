//! Terminal dashboard for the bot console
//!
//! # Keyboard Controls
//! - `m`: Toggle execution mode (SIMULATED / LIVE), only while stopped
//! - `s`: Start the bot
//! - `x`: Request stop (opens the confirmation dialog), `y`/`n` to answer
//! - `r`: Reset from ERROR, or reconnect a failed log stream
//! - `↑/k` `↓/j`: Scroll logs
//! - `l`: Toggle DEBUG diagnostics
//! - `q` or `Ctrl+C`: Quit

pub mod app;
pub mod event;
pub mod logging;
pub mod ui;

pub use app::{ConsoleEntry, ConsoleState, Dashboard, DashboardView, MAX_CONSOLE_ENTRIES};
pub use event::{map_key, next_action, UserAction};
pub use logging::TuiLayer;
