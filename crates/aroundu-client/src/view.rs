//! Read-only snapshot of client state for presentation layers.

use aroundu_core::{ChannelState, Stage, session::Identity};
use aroundu_proto::{
    UserId,
    payloads::{
        negotiation::RequestPeer,
        presence::NearbyUser,
        room::{ChatMessage, Room, RoomUser},
    },
};

/// Everything a front end needs to render the session.
///
/// Owned and cloneable so it can cross a channel or be diffed in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientView {
    /// Channel lifecycle state
    pub channel: ChannelState,
    /// Transport error while reconnecting
    pub transport_error: Option<String>,
    /// Transient server error
    pub server_error: Option<String>,
    /// Derived session stage
    pub stage: Stage,
    /// Session identity
    pub identity: Identity,
    /// Nearby users. `None` while in a room or before the first snapshot.
    pub nearby: Option<Vec<NearbyUser>>,
    /// Pending incoming request
    pub incoming: Option<RequestPeer>,
    /// Outstanding outgoing request
    pub outgoing: Option<UserId>,
    /// Current room
    pub room: Option<Room>,
    /// Room message log
    pub messages: Vec<ChatMessage>,
    /// Room roster
    pub roster: Vec<RoomUser>,
    /// Participant currently typing
    pub typing: Option<UserId>,
}

impl ClientView {
    /// Whether events can be exchanged.
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Error to show: the transport error wins over a server error.
    pub fn error(&self) -> Option<&str> {
        self.transport_error.as_deref().or(self.server_error.as_deref())
    }

    /// Whether a message was written by this session.
    pub fn is_mine(&self, message: &ChatMessage) -> bool {
        self.identity.id.as_deref() == Some(message.user_id.as_str())
    }
}

impl Default for ClientView {
    fn default() -> Self {
        Self {
            channel: ChannelState::Idle,
            transport_error: None,
            server_error: None,
            stage: Stage::Anonymous,
            identity: Identity::default(),
            nearby: None,
            incoming: None,
            outgoing: None,
            room: None,
            messages: Vec::new(),
            roster: Vec::new(),
            typing: None,
        }
    }
}
