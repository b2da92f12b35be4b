//! TUI UI Rendering
//!
//! Renders the dashboard using ratatui:
//! - Header: run state, execution mode, strategy, stream state
//! - Control / Market / Position panels side by side
//! - News headlines
//! - Logs: scrollable bot log stream
//! - Footer: latest console diagnostic
//! - Stop confirmation dialog on top when open

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::api::{ExecutionMode, SentimentBias};
use crate::core::{ConnectionState, LogLevel, NoticeLevel, RunState};

use super::app::DashboardView;

/// Main draw function - renders the entire UI
pub fn draw(frame: &mut Frame, view: &DashboardView) {
    // Minimum useful height: 3+8+6+6+1 = 24 rows
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(8), // Panels
            Constraint::Length(6), // News
            Constraint::Min(6),    // Logs
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], view);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(chunks[1]);
    draw_control(frame, panels[0], view);
    draw_market(frame, panels[1], view);
    draw_position(frame, panels[2], view);

    draw_news(frame, chunks[2], view);
    draw_logs(frame, chunks[3], view);
    draw_footer(frame, chunks[4], view);

    if view.lifecycle.awaiting_stop_confirmation() {
        draw_stop_dialog(frame, frame.area());
    }
}

pub fn run_state_color(state: RunState) -> Color {
    match state {
        RunState::Running => Color::Green,
        RunState::Starting | RunState::Stopping => Color::Yellow,
        RunState::Error => Color::Red,
        RunState::Idle | RunState::Stopped => Color::DarkGray,
    }
}

fn mode_span(mode: ExecutionMode) -> Span<'static> {
    match mode {
        ExecutionMode::Simulated => Span::styled(
            "SIMULATED",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        ExecutionMode::Live => Span::styled(
            "LIVE TRADING",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

fn stream_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Open => Color::Green,
        ConnectionState::Connecting | ConnectionState::Reconnecting { .. } => Color::Yellow,
        ConnectionState::Failed => Color::Red,
    }
}

fn bias_color(bias: SentimentBias) -> Color {
    match bias {
        SentimentBias::Bullish => Color::Green,
        SentimentBias::Neutral => Color::Yellow,
        SentimentBias::Bearish => Color::Red,
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| "-".to_string())
}

/// Draw header with run state, mode and stream status
fn draw_header(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let state = view.lifecycle.state();
    let state_text = if view.lifecycle.command_in_flight() && state != RunState::Stopping {
        format!("● {} …", state)
    } else {
        format!("● {}", state)
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            state_text,
            Style::default()
                .fg(run_state_color(state))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  │  Mode: "),
        mode_span(view.lifecycle.mode()),
        Span::raw("  │  Strategy: "),
        Span::styled(
            view.lifecycle.strategy().to_string(),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  │  Stream: "),
        Span::styled(
            view.stream_state.to_string(),
            Style::default().fg(stream_color(view.stream_state)),
        ),
        Span::raw("  │  Up: "),
        Span::styled(view.uptime.clone(), Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Bot Console"));

    frame.render_widget(header, area);
}

/// Draw control panel: key hints for the current state plus the notice
fn draw_control(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let state = view.lifecycle.state();
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let mut lines = Vec::new();
    match state {
        RunState::Idle | RunState::Stopped => {
            lines.push(Line::from(vec![key("s"), Span::raw(" start   "), key("m"), Span::raw(" toggle mode")]));
        }
        RunState::Starting | RunState::Running => {
            lines.push(Line::from(vec![key("x"), Span::raw(" stop bot")]));
        }
        RunState::Stopping => {
            lines.push(Line::from(Span::styled(
                "Waiting for the bot to confirm it stopped…",
                Style::default().fg(Color::Yellow),
            )));
        }
        RunState::Error => {
            lines.push(Line::from(Span::styled(
                "Remote state unknown. Check the bot manually.",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(vec![key("r"), Span::raw(" reset from live status")]));
        }
    }
    if view.stream_state == ConnectionState::Failed && state != RunState::Error {
        lines.push(Line::from(vec![key("r"), Span::raw(" reconnect log stream")]));
    }
    if view.lifecycle.mode() == ExecutionMode::Live && !state.is_active() {
        lines.push(Line::from(Span::styled(
            "Live mode: real orders will be placed",
            Style::default().fg(Color::Red),
        )));
    }

    if let Some(notice) = view.lifecycle.notice() {
        let color = match notice.level {
            NoticeLevel::Info => Color::Cyan,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(notice.message.clone(), Style::default().fg(color))));
    }

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Control"));
    frame.render_widget(panel, area);
}

/// Draw market snapshot and sentiment
fn draw_market(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let snapshot = &view.telemetry.snapshot;

    let pnl_color = match snapshot.realized_pnl {
        Some(p) if p >= 0.0 => Color::Green,
        Some(_) => Color::Red,
        None => Color::DarkGray,
    };

    let sentiment_span = match (snapshot.sentiment, snapshot.sentiment_bias()) {
        (Some(score), Some(bias)) => Span::styled(
            format!("{:+.2} {}", score, bias),
            Style::default().fg(bias_color(bias)),
        ),
        _ => Span::styled("-", Style::default().fg(Color::DarkGray)),
    };

    let mut lines = vec![
        Line::from(vec![
            Span::raw("Index:     "),
            Span::styled(fmt_opt(snapshot.index_level, 2), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("VIX:       "),
            Span::styled(fmt_opt(snapshot.volatility_index, 2), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("P&L:       "),
            Span::styled(
                snapshot
                    .realized_pnl
                    .map(|p| format!("{:+.2}", p))
                    .unwrap_or_else(|| "-".to_string()),
                Style::default().fg(pnl_color),
            ),
        ]),
        Line::from(vec![Span::raw("Sentiment: "), sentiment_span]),
    ];

    let title = if view.telemetry.is_stale() {
        lines.push(Line::from(Span::styled(
            "STALE: telemetry sources unreachable",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        "Market (stale)"
    } else {
        "Market"
    };

    let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(panel, area);
}

/// Draw the open position, if any
fn draw_position(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let lines = match &view.telemetry.position {
        Some(pos) => vec![
            Line::from(vec![
                Span::styled(
                    "● OPEN ",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::styled(pos.leg.clone(), Style::default().fg(Color::Cyan)),
            ]),
            Line::from(vec![
                Span::raw("Symbol: "),
                Span::styled(pos.symbol.clone(), Style::default().fg(Color::White)),
            ]),
            Line::from(format!("Qty:    {}", pos.quantity)),
            Line::from(vec![
                Span::raw("Entry:  "),
                Span::styled(format!("{:.2}", pos.entry_price), Style::default().fg(Color::Yellow)),
            ]),
            Line::from(vec![
                Span::raw("SL:     "),
                Span::styled(fmt_opt(pos.sl_price, 2), Style::default().fg(Color::Red)),
            ]),
            Line::from(format!("Value:  {:.2}", pos.invested_value())),
        ],
        None => vec![Line::from(Span::styled(
            "○ No open position",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Position"));
    frame.render_widget(panel, area);
}

/// Draw latest headlines with their sentiment
fn draw_news(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let (items, title) = match &view.telemetry.news {
        Some(news) => {
            let items: Vec<ListItem> = news
                .articles
                .iter()
                .take(area.height.saturating_sub(2) as usize)
                .map(|article| {
                    let bias = SentimentBias::classify(article.sentiment);
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{:+.2} ", article.sentiment),
                            Style::default().fg(bias_color(bias)),
                        ),
                        Span::styled(
                            format!("{:<12} ", article.source),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::raw(article.title.clone()),
                    ]))
                })
                .collect();
            let bias = SentimentBias::classify(news.sentiment);
            (items, format!("News (overall {:+.2} {})", news.sentiment, bias))
        }
        None => (Vec::new(), "News".to_string()),
    };

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Error => Color::Red,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Info => Color::Cyan,
        LogLevel::System => Color::Magenta,
    }
}

/// Draw scrollable log panel
fn draw_logs(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let log_items: Vec<ListItem> = view
        .logs
        .iter()
        .rev() // Most recent first
        .skip(view.log_scroll_offset)
        .take(area.height.saturating_sub(2) as usize) // Fit in area minus borders
        .map(|event| {
            ListItem::new(Line::from(vec![
                Span::styled(event.timestamp.clone(), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(
                    format!("{:7}", event.level.as_str()),
                    Style::default().fg(level_color(event.level)),
                ),
                Span::raw(" "),
                Span::raw(event.message.clone()),
            ]))
        })
        .collect();

    let scroll_indicator = if view.log_scroll_offset > 0 {
        format!(" [+{}]", view.log_scroll_offset)
    } else {
        String::new()
    };
    let title = format!(
        "Bot Logs {}/{} (↑/↓ scroll){}",
        view.logs.len(),
        crate::core::MAX_LOG_EVENTS,
        scroll_indicator
    );

    let logs = List::new(log_items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(logs, area);
}

/// One-line footer: latest console diagnostic and key summary
fn draw_footer(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let mut spans = vec![Span::styled(
        "q quit  l debug  ",
        Style::default().fg(Color::DarkGray),
    )];
    if view.show_debug_logs {
        spans.push(Span::styled("[DEBUG ON] ", Style::default().fg(Color::Magenta)));
    }
    if let Some(entry) = &view.latest_console {
        let color = match entry.level.as_str() {
            "ERROR" => Color::Red,
            "WARN" => Color::Yellow,
            _ => Color::DarkGray,
        };
        spans.push(Span::styled(
            format!("{} {} {}", entry.timestamp, entry.level, entry.message),
            Style::default().fg(color),
        ));
    }
    if view.dropped_logs_count > 0 {
        spans.push(Span::styled(
            format!("  ({} dropped)", view.dropped_logs_count),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Centered rect of `width` x `height` cells inside `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Stop confirmation gate
fn draw_stop_dialog(frame: &mut Frame, area: Rect) {
    let dialog = centered_rect(56, 7, area);
    let lines = vec![
        Line::from(Span::styled(
            "Stop the bot?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Open positions will NOT be closed automatically.",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" stop bot    "),
            Span::styled("n", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]),
    ];

    frame.render_widget(Clear, dialog);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Confirm Shutdown"),
        ),
        dialog,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Lifecycle, LogEvent, TelemetryState};
    use ratatui::{backend::TestBackend, Terminal};

    fn view() -> DashboardView {
        DashboardView {
            lifecycle: Lifecycle::default(),
            stream_state: ConnectionState::Open,
            logs: vec![LogEvent::system("Connected to log stream (ws://localhost:8000/ws/logs)")],
            telemetry: TelemetryState::default(),
            latest_console: None,
            dropped_logs_count: 0,
            log_scroll_offset: 0,
            show_debug_logs: false,
            uptime: "0h00m".to_string(),
        }
    }

    fn render(view: &DashboardView) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, view)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_renders_idle_dashboard() {
        let screen = render(&view());
        assert!(screen.contains("IDLE"));
        assert!(screen.contains("SIMULATED"));
        assert!(screen.contains("No open position"));
        assert!(screen.contains("Connected to log stream"));
        assert!(!screen.contains("Confirm Shutdown"));
    }

    #[test]
    fn test_renders_stop_dialog_when_gate_open() {
        let mut v = view();
        v.lifecycle.seed(&Ok(crate::api::RemoteStatus::Running));
        v.lifecycle.request_stop().unwrap();
        let screen = render(&v);
        assert!(screen.contains("Confirm Shutdown"));
        assert!(screen.contains("NOT be closed"));
    }

    #[test]
    fn test_centered_rect_clamps() {
        let area = Rect::new(0, 0, 20, 5);
        let r = centered_rect(56, 7, area);
        assert_eq!(r, Rect::new(0, 0, 20, 5));
    }
}
