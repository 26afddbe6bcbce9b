//! Status bar
//!
//! Displays connection state, who we are and the latest notice.

use aroundu_app::{App, ConnectionState};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Short label for a connection state.
pub fn connection_label(state: ConnectionState) -> String {
    match state {
        ConnectionState::Disconnected => "Disconnected".into(),
        ConnectionState::Connecting => "Connecting...".into(),
        ConnectionState::Reconnecting { attempt } => format!("Reconnecting (attempt {attempt})"),
        ConnectionState::Connected => "Connected".into(),
        ConnectionState::Failed => "Offline".into(),
    }
}

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.connection_state();
    let color = match state {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting | ConnectionState::Reconnecting { .. } => Color::Yellow,
        ConnectionState::Disconnected | ConnectionState::Failed => Color::Red,
    };
    let connection = Span::styled(
        connection_label(state),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    );

    let identity = app
        .view()
        .identity
        .username
        .as_deref()
        .map_or_else(String::new, |name| format!(" | {name}"));
    let notice = app.status_message().map_or_else(String::new, |msg| format!(" | {msg}"));

    let status_line = Line::from(vec![
        Span::raw(" "),
        connection,
        Span::raw(identity),
        Span::styled(notice, Style::default().fg(Color::Yellow)),
    ]);

    let paragraph =
        Paragraph::new(status_line).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
