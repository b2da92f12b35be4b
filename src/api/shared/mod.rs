//! Shared helpers for the bot connections
//!
//! WebSocket connection setup and the reconnection backoff policy used by the
//! log stream.

pub mod reconnect;
pub mod websocket;

pub use reconnect::{backoff_delay, reconnect_with_backoff, ReconnectConfig};
pub use websocket::{connect_ws, WsStream};
