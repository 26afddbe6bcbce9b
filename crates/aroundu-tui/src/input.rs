//! Input state and key handling for the TUI.
//!
//! This module owns all text input state (buffer, cursor) and handles
//! character-level key events. Command parsing happens here on Enter.

use aroundu_app::{App, AppAction, KeyInput, Screen};
use aroundu_core::location::radius_label;

use crate::commands::{self, Command, HELP};

/// Input state for the TUI.
///
/// Manages the text input buffer and cursor position.
/// Handles all character-level key events.
#[derive(Debug, Default)]
pub struct InputState {
    /// Text buffer for user input.
    buffer: String,
    /// Cursor position in characters.
    cursor: usize,
}

impl InputState {
    /// Create a new empty input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text in the input buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Current cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Handle a key input event.
    ///
    /// Returns actions to process (may be empty for input-only keys,
    /// or contain protocol actions for commands).
    pub fn handle_key(&mut self, key: KeyInput, app: &mut App) -> Vec<AppAction> {
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.buffer.insert(at, c);
                self.cursor += 1;
                Self::edited(app)
            },
            KeyInput::Backspace => {
                if self.cursor == 0 {
                    return vec![];
                }
                self.cursor -= 1;
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                Self::edited(app)
            },
            KeyInput::Delete => {
                if self.cursor >= self.len() {
                    return vec![];
                }
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                Self::edited(app)
            },
            KeyInput::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                vec![AppAction::Render]
            },
            KeyInput::Right => {
                self.cursor = (self.cursor + 1).min(self.len());
                vec![AppAction::Render]
            },
            KeyInput::Home => {
                self.cursor = 0;
                vec![AppAction::Render]
            },
            KeyInput::End => {
                self.cursor = self.len();
                vec![AppAction::Render]
            },
            KeyInput::Up => app.select_previous(),
            KeyInput::Down => app.select_next(),
            KeyInput::Tab => app.cycle_radius(),
            KeyInput::Esc => app.quit(),
            KeyInput::Enter => self.handle_enter(app),
        }
    }

    /// Handle Enter key - parse command and call App API.
    ///
    /// An empty line invites the highlighted user on the nearby screen.
    fn handle_enter(&mut self, app: &mut App) -> Vec<AppAction> {
        let text = std::mem::take(&mut self.buffer);
        self.cursor = 0;

        if text.trim().is_empty() {
            return if app.screen() == Screen::Nearby { app.request_selected() } else { vec![] };
        }

        match commands::parse(&text) {
            Command::Locate { lat, lon } => app.register_location(lat, lon),
            Command::Radius { meters } => {
                app.set_radius(meters);
                status(app, format!("Radius set to {}", radius_label(meters)))
            },
            Command::Profile { username, gender, interest } => {
                app.update_profile(&username, &gender, &interest)
            },
            Command::Match => app.start_matching(),
            Command::Refresh => app.refresh_nearby(),
            Command::Chat { position: None } => app.request_selected(),
            Command::Chat { position: Some(position) } => {
                match app.nearby().get(position - 1).map(|user| user.id.clone()) {
                    Some(id) => app.request_chat(id),
                    None => status(app, format!("No nearby user at position {position}")),
                }
            },
            Command::Accept => app.respond(true),
            Command::Decline => app.respond(false),
            Command::Leave => app.leave_room(),
            Command::Help => status(app, HELP),
            Command::Quit => app.quit(),
            Command::Message { text } => {
                if app.screen() == Screen::Chat {
                    app.send_message(text)
                } else {
                    status(app, "Not in a chat. Type /help for commands.")
                }
            },
            Command::Unknown { input } => status(app, format!("Unknown command: {input}")),
            Command::InvalidArgs { command, error } => status(app, format!("/{command}: {error}")),
        }
    }

    /// Editing the chat input doubles as the typing signal.
    fn edited(app: &App) -> Vec<AppAction> {
        let mut actions = app.input_changed();
        actions.push(AppAction::Render);
        actions
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }
}

fn status(app: &mut App, message: impl Into<String>) -> Vec<AppAction> {
    app.set_status(message);
    vec![AppAction::Render]
}
