//! Nearby users
//!
//! The lobby: who is around, the pending request in either direction.

use aroundu_app::App;
use aroundu_client::Stage;
use aroundu_proto::payloads::{negotiation::RequestPeer, presence::NearbyUser};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

const SELECTED_PREFIX: &str = ">";
const UNSELECTED_PREFIX: &str = " ";
const BANNER_HEIGHT: u16 = 3;

/// One row of the nearby list.
pub fn user_line(user: &NearbyUser, selected: bool) -> String {
    let prefix = if selected { SELECTED_PREFIX } else { UNSELECTED_PREFIX };
    format!("{prefix} [{}] {} ({})", user.avatar, user.username, user.distance_label())
}

/// Banner text for an incoming request.
pub fn incoming_line(peer: &RequestPeer) -> String {
    let distance = peer.distance.map_or_else(String::new, |d| format!(", {}m away", d.round()));
    format!("{} wants to chat{distance}. /accept or /decline", peer.username)
}

/// Render the nearby screen.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let view = app.view();
    let banner = view
        .incoming
        .as_ref()
        .map(|peer| (incoming_line(peer), Color::Cyan))
        .or_else(|| {
            view.outgoing.as_ref().map(|_| ("Waiting for an answer...".to_string(), Color::Yellow))
        })
        .or_else(|| {
            (view.stage == Stage::Matching)
                .then(|| ("Looking for someone nearby...".to_string(), Color::Yellow))
        });

    let list_area = match banner {
        Some((text, color)) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(BANNER_HEIGHT), Constraint::Min(1)])
                .split(area);
            let [banner_area, list_area] = chunks.as_ref() else {
                return;
            };
            let paragraph = Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )))
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(paragraph, *banner_area);
            *list_area
        },
        None => area,
    };

    let items: Vec<ListItem> = if app.nearby().is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "Nobody nearby yet. /refresh to look again, /match to wait for someone.",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        app.nearby()
            .iter()
            .enumerate()
            .map(|(i, user)| {
                let selected = i == app.selected();
                let style = if selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(user_line(user, selected), style)))
            })
            .collect()
    };

    let title = format!(" Nearby ({}) ", app.nearby().len());
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, list_area);
}
