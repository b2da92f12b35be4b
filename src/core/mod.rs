//! Core module - run-state lifecycle, status polling, log stream, telemetry
//!
//! # Module Architecture
//!
//! This module uses **explicit re-exports** instead of glob exports (`pub use module::*`)
//! to provide better API visibility and prevent accidental public API changes.
//!
//! ## Usage
//! Prefer importing from `crate::core`:
//! ```ignore
//! use crate::core::{SessionController, LogStreamClient, TelemetryPoller};
//! ```

pub mod lifecycle;
pub mod log_buffer;
pub mod log_stream;
pub mod polling;
pub mod session;
pub mod status_poller;
pub mod telemetry;

// Explicit re-exports for lifecycle module
pub use lifecycle::{Lifecycle, LifecycleError, Notice, NoticeLevel, RunState};

// Explicit re-exports for log buffer and stream modules
pub use log_buffer::{
    decode_log_event, shared_log_buffer, LogBuffer, LogEvent, LogLevel, SharedLogBuffer,
    MAX_LOG_EVENTS,
};
pub use log_stream::{ConnectionState, LogStreamClient};

// Explicit re-exports for session and polling modules
pub use polling::poll_loop;
pub use session::{SessionConfig, SessionController, SessionError};
pub use status_poller::{confirm_stopped, status_poll_task};

// Explicit re-exports for telemetry module
pub use telemetry::{
    SharedTelemetry, SourceHealth, TelemetryConfig, TelemetryPoller, TelemetrySnapshot,
    TelemetryState,
};
