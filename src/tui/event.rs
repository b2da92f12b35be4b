//! Async keyboard event handling for TUI
//!
//! Uses crossterm's EventStream for non-blocking, async-compatible input.
//! Keys are mapped to [`UserAction`]s; the dashboard applies them.

use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use tracing::warn;

/// How long one poll waits for input before the UI redraws
pub const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Operator intent decoded from a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Quit,
    ToggleMode,
    Start,
    RequestStop,
    ConfirmStop,
    CancelStop,
    Reset,
    ScrollUp,
    ScrollDown,
    ToggleDebug,
}

/// Poll for one key press with a short timeout.
///
/// `None` when no input arrived. A closed event stream reads as `Quit`;
/// I/O errors are logged as warnings rather than silently swallowed.
pub async fn next_action(
    event_stream: &mut EventStream,
    awaiting_stop_confirmation: bool,
) -> Option<UserAction> {
    let maybe_event = tokio::time::timeout(INPUT_POLL_TIMEOUT, event_stream.next()).await;

    match maybe_event {
        Err(_) => None,
        Ok(None) => Some(UserAction::Quit),
        Ok(Some(Err(e))) => {
            warn!(event_type = "TERMINAL_IO_ERROR", error = %e, "Terminal I/O error during event polling");
            None
        }
        // Windows reports both press and release
        Ok(Some(Ok(Event::Key(key)))) if key.kind == KeyEventKind::Press => {
            map_key(key.code, key.modifiers, awaiting_stop_confirmation)
        }
        Ok(Some(Ok(_))) => None,
    }
}

/// Map a key to an action.
///
/// While the stop confirmation dialog is open only its answers (and quit)
/// are accepted, so a stray key cannot bypass the gate.
pub fn map_key(
    code: KeyCode,
    modifiers: KeyModifiers,
    awaiting_stop_confirmation: bool,
) -> Option<UserAction> {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Some(UserAction::Quit);
    }

    if awaiting_stop_confirmation {
        return match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserAction::ConfirmStop),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(UserAction::CancelStop),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(UserAction::Quit),
            _ => None,
        };
    }

    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(UserAction::Quit),
        KeyCode::Char('m') | KeyCode::Char('M') => Some(UserAction::ToggleMode),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(UserAction::Start),
        KeyCode::Char('x') | KeyCode::Char('X') => Some(UserAction::RequestStop),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(UserAction::Reset),
        KeyCode::Char('k') | KeyCode::Up => Some(UserAction::ScrollUp),
        KeyCode::Char('j') | KeyCode::Down => Some(UserAction::ScrollDown),
        KeyCode::Char('l') | KeyCode::Char('L') => Some(UserAction::ToggleDebug),
        // y/n outside the dialog mean nothing
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_quit_q() {
        assert_eq!(
            map_key(KeyCode::Char('q'), KeyModifiers::empty(), false),
            Some(UserAction::Quit)
        );
        assert_eq!(
            map_key(KeyCode::Char('c'), KeyModifiers::CONTROL, true),
            Some(UserAction::Quit)
        );
    }

    #[test]
    fn test_command_keys() {
        let none = KeyModifiers::empty();
        assert_eq!(map_key(KeyCode::Char('m'), none, false), Some(UserAction::ToggleMode));
        assert_eq!(map_key(KeyCode::Char('s'), none, false), Some(UserAction::Start));
        assert_eq!(map_key(KeyCode::Char('x'), none, false), Some(UserAction::RequestStop));
        assert_eq!(map_key(KeyCode::Char('r'), none, false), Some(UserAction::Reset));
        assert_eq!(map_key(KeyCode::Up, none, false), Some(UserAction::ScrollUp));
        assert_eq!(map_key(KeyCode::Char('j'), none, false), Some(UserAction::ScrollDown));
        assert_eq!(map_key(KeyCode::Char('L'), none, false), Some(UserAction::ToggleDebug));
    }

    #[test]
    fn test_confirmation_keys_only_inside_dialog() {
        let none = KeyModifiers::empty();
        assert_eq!(map_key(KeyCode::Char('y'), none, false), None);
        assert_eq!(map_key(KeyCode::Char('y'), none, true), Some(UserAction::ConfirmStop));
        assert_eq!(map_key(KeyCode::Esc, none, true), Some(UserAction::CancelStop));
        assert_eq!(map_key(KeyCode::Char('n'), none, true), Some(UserAction::CancelStop));
    }

    #[test]
    fn test_dialog_swallows_other_commands() {
        let none = KeyModifiers::empty();
        assert_eq!(map_key(KeyCode::Char('s'), none, true), None);
        assert_eq!(map_key(KeyCode::Char('m'), none, true), None);
        assert_eq!(map_key(KeyCode::Char('x'), none, true), None);
    }
}
