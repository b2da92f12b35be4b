//! Bot Console - operator console for a remote trading bot
//!
//! Keeps a local view of the bot's run state in sync with the bot itself:
//! - Start/stop commands with a pessimistic, bounded stop confirmation
//! - Periodic status polling feeding a run-state machine
//! - Auto-reconnecting, bounded log stream
//! - Market, sentiment, position and news telemetry

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod tui;

pub use error::AppError;
