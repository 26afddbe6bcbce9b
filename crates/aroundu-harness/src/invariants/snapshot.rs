//! Frozen copies of what each simulated client shows.
//!
//! Built from a [`ClientView`], a live [`Client`] or an [`App`], so the same
//! rules run against the reducer, the view model and a full world.

use std::collections::BTreeMap;

use aroundu_app::{App, Screen};
use aroundu_client::{Client, ClientView, Environment, Stage};
use aroundu_proto::{RoomId, UserId};

/// Every client in a world, plus the server's room table when known.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
    /// Server rooms and their member ids. `None` when no server is involved.
    pub server_rooms: Option<BTreeMap<RoomId, Vec<UserId>>>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client], server_rooms: None }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients, server_rooms: None }
    }

    /// Snapshot of what an App currently shows.
    pub fn from_app(app: &App) -> Self {
        Self::single(ClientSnapshot::from_view(0, app.view()).with_screen(app.screen()))
    }

    /// Attach the server's room table.
    #[must_use]
    pub fn with_server_rooms(mut self, rooms: BTreeMap<RoomId, Vec<UserId>>) -> Self {
        self.server_rooms = Some(rooms);
        self
    }

    /// Add a client snapshot.
    pub fn add_client(&mut self, client: ClientSnapshot) {
        self.clients.push(client);
    }
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSnapshot {
    /// Harness-local client index.
    pub index: usize,
    /// Server-assigned id, once known.
    pub user_id: Option<UserId>,
    /// Whether the channel is connected.
    pub connected: bool,
    /// Derived stage.
    pub stage: Stage,
    /// Current room.
    pub room: Option<RoomId>,
    /// Messages in the room log.
    pub message_count: usize,
    /// Roster size.
    pub roster_len: usize,
    /// Remote typing slot occupied.
    pub typing_shown: bool,
    /// Nearby list length. `None` when hidden or unknown.
    pub nearby: Option<usize>,
    /// Pending incoming request sender.
    pub incoming: Option<UserId>,
    /// Outstanding outgoing request target.
    pub outgoing: Option<UserId>,
    /// Typing-idle timer armed. `None` when taken from a view.
    pub typing_armed: Option<bool>,
    /// Auto-match timer armed. `None` when taken from a view.
    pub auto_match_armed: Option<bool>,
    /// Visible screen, when taken from an App.
    pub screen: Option<Screen>,
}

impl ClientSnapshot {
    /// Snapshot from a client view. Timer state is unknown.
    pub fn from_view(index: usize, view: &ClientView) -> Self {
        Self {
            index,
            user_id: view.identity.id.clone(),
            connected: view.is_connected(),
            stage: view.stage,
            room: view.room.as_ref().map(|room| room.id.clone()),
            message_count: view.messages.len(),
            roster_len: view.roster.len(),
            typing_shown: view.typing.is_some(),
            nearby: view.nearby.as_ref().map(Vec::len),
            incoming: view.incoming.as_ref().map(|peer| peer.id.clone()),
            outgoing: view.outgoing.clone(),
            typing_armed: None,
            auto_match_armed: None,
            screen: None,
        }
    }

    /// Snapshot from a live client, including timer state.
    pub fn from_client<E: Environment>(index: usize, client: &Client<E>) -> Self {
        let mut snapshot = Self::from_view(index, &client.view());
        snapshot.typing_armed = Some(client.typing().idle_deadline().is_some());
        snapshot.auto_match_armed = Some(client.auto_match_deadline().is_some());
        snapshot
    }

    /// Record the visible screen.
    #[must_use]
    pub fn with_screen(mut self, screen: Screen) -> Self {
        self.screen = Some(screen);
        self
    }
}
