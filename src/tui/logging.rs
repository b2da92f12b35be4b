//! Custom tracing Layer for TUI log capture
//!
//! The dashboard owns the terminal, so the console's own diagnostics are
//! captured here and shown in its notice line instead of being printed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::app::{ConsoleEntry, ConsoleState};

/// Tracks whether DEBUG diagnostics are captured. Mirrors
/// `ConsoleState::show_debug_logs` so the layer never locks just to check it.
static SHOW_DEBUG: AtomicBool = AtomicBool::new(false);

/// Diagnostics dropped due to lock contention, synced into
/// `ConsoleState::dropped_logs_count` on the next successful lock.
static DROPPED_LOGS: AtomicU64 = AtomicU64::new(0);

/// Fields appended to the message for a richer one-line display
const DISPLAYED_FIELDS: &[&str] = &["event_type", "command", "state", "to", "error"];

/// Update the global DEBUG filter flag
pub fn set_show_debug(enabled: bool) {
    SHOW_DEBUG.store(enabled, Ordering::Relaxed);
}

/// Layer capturing WARN and ERROR (plus DEBUG when toggled on) into the
/// console state. INFO stays out: the bot's own log stream is the main feed.
///
/// `on_event()` MUST use `try_lock()`: events can fire while the draw loop
/// holds the console lock, and `lock()` would deadlock. Dropped entries are
/// counted instead.
pub struct TuiLayer {
    console: Arc<Mutex<ConsoleState>>,
}

impl TuiLayer {
    pub fn new(console: Arc<Mutex<ConsoleState>>) -> Self {
        Self { console }
    }
}

fn captured(level: &Level, show_debug: bool) -> bool {
    match *level {
        Level::ERROR | Level::WARN => true,
        Level::DEBUG => show_debug,
        _ => false,
    }
}

impl<S: Subscriber> Layer<S> for TuiLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = event.metadata().level();
        if !captured(level, SHOW_DEBUG.load(Ordering::Relaxed)) {
            return;
        }

        let mut message = String::new();
        let mut extra_fields = Vec::new();
        let mut visitor = MessageVisitor {
            message: &mut message,
            extra_fields: &mut extra_fields,
        };
        event.record(&mut visitor);

        if !extra_fields.is_empty() {
            message.push_str(" [");
            message.push_str(&extra_fields.join(", "));
            message.push(']');
        }

        let entry = ConsoleEntry {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level: level.to_string(),
            message,
        };

        match self.console.try_lock() {
            Ok(mut console) => {
                let dropped = DROPPED_LOGS.swap(0, Ordering::Relaxed);
                if dropped > 0 {
                    console.dropped_logs_count += dropped;
                }
                console.push_console(entry);
            }
            Err(_) => {
                DROPPED_LOGS.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Visitor to extract message and key structured fields from tracing events
struct MessageVisitor<'a> {
    message: &'a mut String,
    extra_fields: &'a mut Vec<String>,
}

impl<'a> tracing::field::Visit for MessageVisitor<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = format!("{:?}", value).trim_matches('"').to_string();
        } else if DISPLAYED_FIELDS.contains(&field.name()) {
            self.extra_fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else if DISPLAYED_FIELDS.contains(&field.name()) {
            self.extra_fields.push(format!("{}={}", field.name(), value));
        }
    }
}
