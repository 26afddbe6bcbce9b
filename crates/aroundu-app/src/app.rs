//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the application completely decoupled from I/O and protocol
//! mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Holds the latest [`ClientView`] and the [`Screen`] selected from it.
//! - Tracks the nearby-user selection and the chosen discovery radius.
//! - Stores terminal dimensions to handle resize events.
//! - Keeps the last notice for the status line.

use aroundu_client::ClientView;
use aroundu_core::location::{DEFAULT_RADIUS, RADIUS_PRESETS};
use aroundu_proto::{UserId, payloads::presence::NearbyUser};

use crate::{AppAction, AppEvent, ConnectionState, Screen};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Server base URL.
    server_addr: String,
    /// Latest client snapshot.
    view: ClientView,
    /// Screen selected from `view`.
    screen: Screen,
    /// Connection state derived from `view`, or `Connecting` before the first
    /// snapshot arrives.
    connection: ConnectionState,
    /// Radius sent with the next location registration.
    radius: u32,
    /// Index into the nearby list.
    selected: usize,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create a new App with the given server address.
    pub fn new(server_addr: String) -> Self {
        let view = ClientView::default();
        Self {
            server_addr,
            screen: Screen::select(&view),
            connection: ConnectionState::from(view.channel),
            view,
            radius: DEFAULT_RADIUS,
            selected: 0,
            terminal_size: (80, 24),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(_) | AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Connecting => {
                if self.connection == ConnectionState::Disconnected {
                    self.connection = ConnectionState::Connecting;
                }
                vec![AppAction::Render]
            },
            AppEvent::Updated(view) => self.apply_view(*view),
            AppEvent::Notice(notice) => {
                self.status_message = Some(notice.text());
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    fn apply_view(&mut self, view: ClientView) -> Vec<AppAction> {
        let previous = self.screen;
        self.connection = ConnectionState::from(view.channel);
        self.screen = Screen::select(&view);
        self.view = view;

        let count = self.nearby().len();
        if self.selected >= count {
            self.selected = count.saturating_sub(1);
        }

        let mut actions = Vec::new();
        if self.screen != previous {
            self.status_message = None;
            if self.screen == Screen::Nearby {
                tracing::debug!(?previous, "nearby screen shown, refreshing list");
                actions.push(AppAction::RefreshNearby);
            }
        }
        actions.push(AppAction::Render);
        actions
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Initiate connection to the server.
    pub fn connect(&mut self) -> Vec<AppAction> {
        self.connection = ConnectionState::Connecting;
        vec![AppAction::Connect, AppAction::Render]
    }

    /// Register a location reading with the selected radius.
    pub fn register_location(&self, lat: f64, lon: f64) -> Vec<AppAction> {
        vec![AppAction::RegisterLocation { lat, lon, radius: self.radius }, AppAction::Render]
    }

    /// Report that no location reading is available.
    pub fn location_unavailable(&self, reason: impl Into<String>) -> Vec<AppAction> {
        vec![AppAction::LocationUnavailable { reason: reason.into() }, AppAction::Render]
    }

    /// Submit the profile form.
    pub fn update_profile(&self, username: &str, gender: &str, interest: &str) -> Vec<AppAction> {
        vec![
            AppAction::UpdateProfile {
                username: username.to_string(),
                gender: gender.to_string(),
                interest: interest.to_string(),
            },
            AppAction::Render,
        ]
    }

    /// Ask to be matched.
    pub fn start_matching(&self) -> Vec<AppAction> {
        vec![AppAction::StartMatching, AppAction::Render]
    }

    /// Refresh the nearby list.
    pub fn refresh_nearby(&self) -> Vec<AppAction> {
        vec![AppAction::RefreshNearby, AppAction::Render]
    }

    /// Invite a user.
    pub fn request_chat(&self, target: UserId) -> Vec<AppAction> {
        vec![AppAction::RequestChat { target }, AppAction::Render]
    }

    /// Invite the highlighted nearby user. No-op when the list is empty.
    pub fn request_selected(&self) -> Vec<AppAction> {
        match self.selected_user() {
            Some(user) => self.request_chat(user.id.clone()),
            None => vec![],
        }
    }

    /// Answer the pending incoming request.
    pub fn respond(&self, accept: bool) -> Vec<AppAction> {
        vec![AppAction::RespondChat { accept }, AppAction::Render]
    }

    /// Send a chat message.
    pub fn send_message(&self, text: impl Into<String>) -> Vec<AppAction> {
        vec![AppAction::SendMessage { text: text.into() }, AppAction::Render]
    }

    /// The chat input changed.
    pub fn input_changed(&self) -> Vec<AppAction> {
        if self.screen == Screen::Chat { vec![AppAction::InputChanged] } else { vec![] }
    }

    /// Leave the current room.
    pub fn leave_room(&self) -> Vec<AppAction> {
        vec![AppAction::LeaveRoom, AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Highlight the next nearby user.
    pub fn select_next(&mut self) -> Vec<AppAction> {
        if self.selected + 1 < self.nearby().len() {
            self.selected += 1;
        }
        vec![AppAction::Render]
    }

    /// Highlight the previous nearby user.
    pub fn select_previous(&mut self) -> Vec<AppAction> {
        self.selected = self.selected.saturating_sub(1);
        vec![AppAction::Render]
    }

    /// Cycle through the radius presets.
    pub fn cycle_radius(&mut self) -> Vec<AppAction> {
        let next = RADIUS_PRESETS
            .iter()
            .position(|&preset| preset == self.radius)
            .map_or(0, |index| (index + 1) % RADIUS_PRESETS.len());
        self.radius = RADIUS_PRESETS[next];
        vec![AppAction::Render]
    }

    /// Use a specific radius for the next registration.
    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius;
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Visible screen.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Latest client snapshot.
    pub fn view(&self) -> &ClientView {
        &self.view
    }

    /// Nearby users, empty while unknown.
    pub fn nearby(&self) -> &[NearbyUser] {
        self.view.nearby.as_deref().unwrap_or_default()
    }

    /// Index of the highlighted nearby user.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Highlighted nearby user.
    pub fn selected_user(&self) -> Option<&NearbyUser> {
        self.nearby().get(self.selected)
    }

    /// Radius for the next registration.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Server base URL.
    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
