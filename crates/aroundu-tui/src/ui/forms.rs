//! Single-purpose screens: connecting, error, location and profile.

use aroundu_app::{App, ConnectionState};
use aroundu_core::location::{RADIUS_PRESETS, radius_label};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

fn screen(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'_>>) {
    let block = Block::default().borders(Borders::ALL).title(format!(" {title} "));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn hint(text: &str) -> Line<'_> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

/// Waiting for the server.
pub fn render_connecting(frame: &mut Frame, app: &App, area: Rect) {
    let headline = match app.connection_state() {
        ConnectionState::Failed => "Unable to reach the server.".to_string(),
        ConnectionState::Disconnected => "Disconnected.".to_string(),
        ConnectionState::Reconnecting { attempt } => {
            format!("Reconnecting to {} (attempt {attempt})...", app.server_addr())
        },
        ConnectionState::Connecting | ConnectionState::Connected => {
            format!("Connecting to {}...", app.server_addr())
        },
    };

    let mut lines = vec![Line::from(headline)];
    if let Some(error) = app.view().transport_error.as_deref() {
        lines.push(Line::from(Span::styled(error, Style::default().fg(Color::Red))));
    }
    lines.push(hint("Esc to quit"));
    screen(frame, area, "AroundU", lines);
}

/// A server error is being shown.
pub fn render_error(frame: &mut Frame, app: &App, area: Rect) {
    let message = app.view().error().unwrap_or("Something went wrong.");
    let lines = vec![
        Line::from(Span::styled(message, Style::default().fg(Color::Red))),
        hint("This clears by itself in a few seconds."),
    ];
    screen(frame, area, "Error", lines);
}

/// Ask for a location and show the radius picker.
pub fn render_location(frame: &mut Frame, app: &App, area: Rect) {
    let mut presets = vec![Span::raw("Radius: ")];
    for preset in RADIUS_PRESETS {
        let label = format!(" {} ", radius_label(preset));
        let style = if preset == app.radius() {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        presets.push(Span::styled(label, style));
    }

    let lines = vec![
        Line::from("Share your location to find people nearby."),
        Line::from(""),
        Line::from(presets),
        Line::from(""),
        hint("/locate LAT LON to register, Tab to change the radius"),
    ];
    screen(frame, area, "Location", lines);
}

/// Ask for the profile.
pub fn render_profile(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from("Pick a name so others know who they are talking to."),
        Line::from(""),
        hint("/profile NAME [GENDER] [INTEREST]"),
    ];
    screen(frame, area, "Profile", lines);
}
