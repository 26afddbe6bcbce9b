//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees. Text formatting lives in small helpers so it can
//! be tested without a terminal.

mod chat;
mod forms;
mod input;
mod nearby;
mod status;

use aroundu_app::{App, Screen};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};

pub use chat::{message_line, typing_line};
pub use nearby::{incoming_line, user_line};
pub use status::connection_label;

use crate::InputState;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App, input: &InputState) {
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    render_main_area(frame, app, *main_area);
    input::render(frame, input, *input_area);
    status::render(frame, app, *status_area);
}

/// Render whatever the current screen shows.
fn render_main_area(frame: &mut Frame, app: &App, area: Rect) {
    match app.screen() {
        Screen::Connecting => forms::render_connecting(frame, app, area),
        Screen::Error => forms::render_error(frame, app, area),
        Screen::Location => forms::render_location(frame, app, area),
        Screen::Profile => forms::render_profile(frame, area),
        Screen::Nearby => nearby::render(frame, app, area),
        Screen::Chat => chat::render(frame, app, area),
    }
}
