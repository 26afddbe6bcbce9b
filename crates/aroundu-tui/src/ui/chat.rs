//! Chat room view

use aroundu_app::App;
use aroundu_proto::payloads::room::{ChatMessage, MessageKind};
use chrono::{Local, TimeZone};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Format one transcript line as `HH:MM author: text`.
///
/// System messages drop the author.
pub fn message_line<Tz: TimeZone>(message: &ChatMessage, mine: bool, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let time = message.timestamp.with_timezone(tz).format("%H:%M");
    match message.kind {
        MessageKind::System => format!("{time} * {}", message.text),
        MessageKind::Chat => {
            let author = if mine { "You" } else { message.username.as_str() };
            format!("{time} {author}: {}", message.text)
        },
    }
}

/// Typing indicator for the partner.
pub fn typing_line(name: &str) -> String {
    format!("{name} is typing...")
}

/// Render the active room.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let view = app.view();

    // Two border rows, one row reserved for the typing indicator.
    let visible = usize::from(area.height.saturating_sub(3));
    let skip = view.messages.len().saturating_sub(visible);

    let mut lines: Vec<Line> = view.messages[skip..]
        .iter()
        .map(|message| {
            let mine = view.is_mine(message);
            let style = match (message.kind, mine) {
                (MessageKind::System, _) => {
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
                },
                (MessageKind::Chat, true) => Style::default().fg(Color::Cyan),
                (MessageKind::Chat, false) => Style::default(),
            };
            Line::from(Span::styled(message_line(message, mine, &Local), style))
        })
        .collect();

    if let Some(typing) = view.typing.as_ref() {
        let name = view
            .roster
            .iter()
            .find(|user| &user.id == typing)
            .map_or("Partner", |user| user.username.as_str());
        lines.push(Line::from(Span::styled(
            typing_line(name),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let partner = view
        .roster
        .iter()
        .find(|user| view.identity.id.as_ref() != Some(&user.id))
        .map(|user| user.username.clone());
    let title = match (view.room.as_ref(), partner) {
        (Some(room), Some(name)) => format!(" {} | {name} ", room.id),
        (Some(room), None) => format!(" {} ", room.id),
        (None, _) => " Chat ".to_string(),
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn message(username: &str, text: &str, kind: MessageKind) -> ChatMessage {
        ChatMessage {
            user_id: username.to_lowercase(),
            username: username.into(),
            text: text.into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 4, 30).single().unwrap_or_default(),
            kind,
        }
    }

    #[test]
    fn transcript_lines() {
        let lines = [
            message_line(&message("Ana", "hi", MessageKind::Chat), false, &Utc),
            message_line(&message("Ben", "hello", MessageKind::Chat), true, &Utc),
            message_line(&message("", "Ana left the chat", MessageKind::System), false, &Utc),
        ];

        insta::assert_snapshot!(lines.join("\n"), @r"
        09:04 Ana: hi
        09:04 You: hello
        09:04 * Ana left the chat
        ");
    }

    #[test]
    fn typing_indicator_names_partner() {
        assert_eq!(typing_line("Ana"), "Ana is typing...");
    }
}
