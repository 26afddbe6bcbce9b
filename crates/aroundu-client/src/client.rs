//! Client state machine.
//!
//! The `Client` is the single event reducer for one AroundU session. It owns
//! every unit from `aroundu-core` and applies events strictly in arrival
//! order. Nothing else mutates session state.

use aroundu_core::{
    Channel, ChannelAction, ChannelConfig, Environment, SessionConfig, Stage,
    negotiation::Negotiation,
    presence::PresenceCache,
    room::{ActiveRoom, TypingDebounce},
    session::{Optimistic, Session},
    timer::Timer,
};
use aroundu_proto::{
    ClientCommand, Packet, ProtocolError, ServerEvent, SocketPacket,
    payloads::{
        negotiation::{ChatEnded, ChatRejected, ChatRequest, ChatTarget},
        room::Room,
        session::SessionUser,
    },
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent, Notice},
    view::ClientView,
};

/// Client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection lifecycle
    pub channel: ChannelConfig,
    /// Session behavior and timers
    pub session: SessionConfig,
}

/// Client for one AroundU session.
pub struct Client<E: Environment> {
    /// Environment for time and jitter.
    env: E,

    config: ClientConfig,

    channel: Channel<E::Instant>,

    session: Session,

    presence: PresenceCache,

    negotiation: Negotiation,

    /// Present only while in a room.
    room: Option<ActiveRoom>,

    /// Local typing indicator.
    typing: TypingDebounce<E::Instant>,

    /// Fires `start_matching` after registration and after leaving a room.
    auto_match: Timer<E::Instant>,

    /// Transient server error and its expiry.
    server_error: Option<String>,
    server_error_timer: Timer<E::Instant>,
}

impl<E: Environment> Client<E> {
    /// Create a disconnected client.
    pub fn new(env: E, config: ClientConfig) -> Self {
        let session = &config.session;
        Self {
            channel: Channel::new(config.channel.clone()),
            typing: TypingDebounce::new(session.typing_idle_timeout),
            auto_match: Timer::new(session.auto_match_delay),
            server_error_timer: Timer::new(session.error_notice_ttl),
            session: Session::new(),
            presence: PresenceCache::new(),
            negotiation: Negotiation::new(),
            room: None,
            server_error: None,
            env,
            config,
        }
    }

    /// Configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Channel state machine
    pub fn channel(&self) -> &Channel<E::Instant> {
        &self.channel
    }

    /// Whether events can be exchanged.
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Session identity and registration
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Presence cache
    pub fn presence(&self) -> &PresenceCache {
        &self.presence
    }

    /// Negotiation slots
    pub fn negotiation(&self) -> &Negotiation {
        &self.negotiation
    }

    /// Current room. `None` outside a room.
    pub fn room(&self) -> Option<&ActiveRoom> {
        self.room.as_ref()
    }

    /// Local typing indicator
    pub fn typing(&self) -> &TypingDebounce<E::Instant> {
        &self.typing
    }

    /// Pending auto-match deadline.
    pub fn auto_match_deadline(&self) -> Option<E::Instant> {
        self.auto_match.deadline()
    }

    /// Transient server error.
    pub fn server_error(&self) -> Option<&str> {
        self.server_error.as_deref()
    }

    /// Derived session stage.
    pub fn stage(&self) -> Stage {
        self.session.stage(self.negotiation.is_pending(), self.room.is_some())
    }

    /// Snapshot for presentation.
    pub fn view(&self) -> ClientView {
        let in_room = self.room.is_some();
        ClientView {
            channel: self.channel.state(),
            transport_error: self.channel.transport_error().map(str::to_string),
            server_error: self.server_error.clone(),
            stage: self.stage(),
            identity: self.session.identity().clone(),
            nearby: self.presence.visible(in_room).map(<[_]>::to_vec),
            incoming: self.negotiation.incoming().cloned(),
            outgoing: self.negotiation.outgoing().cloned(),
            room: self.room.as_ref().map(|room| room.room().clone()),
            messages: self.room.as_ref().map(|room| room.messages().to_vec()).unwrap_or_default(),
            roster: self.room.as_ref().map(|room| room.roster().to_vec()).unwrap_or_default(),
            typing: self.room.as_ref().and_then(|room| room.typing().cloned()),
        }
    }

    /// Process an event and return resulting actions.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect => self.handle_connect(),
            ClientEvent::PacketReceived(packet) => self.handle_packet(packet),
            ClientEvent::Server(event) => Ok(self.handle_server_event(event)),
            ClientEvent::ChannelClosed { reason } => Ok(self.handle_channel_closed(&reason)),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::RegisterLocation { lat, lon, radius } => {
                self.handle_register_location(lat, lon, radius)
            },
            ClientEvent::LocationUnavailable { reason } => {
                tracing::warn!(%reason, "location unavailable");
                Err(ClientError::LocationUnavailable { reason })
            },
            ClientEvent::UpdateProfile { username, gender, interest } => {
                self.handle_update_profile(&username, &gender, &interest)
            },
            ClientEvent::StartMatching => self.handle_start_matching(),
            ClientEvent::RefreshNearby => self.handle_refresh_nearby(),
            ClientEvent::RequestChat { target } => self.handle_request_chat(target),
            ClientEvent::RespondChat { accept } => self.handle_respond_chat(accept),
            ClientEvent::SendMessage { text } => self.handle_send_message(text),
            ClientEvent::InputChanged => Ok(self.handle_input_changed()),
            ClientEvent::LeaveRoom => self.handle_leave_room(),
            ClientEvent::Disconnect => Ok(self.handle_disconnect()),
        }
    }

    fn handle_connect(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let now = self.env.now();
        let actions = self.channel.connect(now)?;
        Ok(self.apply_channel_actions(actions))
    }

    fn handle_packet(&mut self, packet: Packet) -> Result<Vec<ClientAction>, ClientError> {
        let now = self.env.now();
        self.channel.handle_activity(now);

        match packet {
            Packet::Open(handshake) => {
                self.channel.handle_handshake(
                    handshake.ping_interval(),
                    handshake.ping_timeout(),
                    now,
                );
                tracing::debug!(sid = %handshake.sid, "engine open, joining namespace");
                Ok(vec![ClientAction::SendPacket(Packet::connect())])
            },
            Packet::Ping => Ok(vec![ClientAction::SendPacket(Packet::Pong)]),
            Packet::Pong | Packet::Noop => Ok(vec![]),
            Packet::Close => Ok(self.handle_channel_closed("transport close")),
            Packet::Message(SocketPacket::Connect { sid }) => {
                self.channel.handle_opened(now)?;
                tracing::info!(?sid, "connected");
                Ok(vec![])
            },
            Packet::Message(SocketPacket::ConnectError { message }) => {
                let random = self.env.random_unit();
                let actions = self.channel.handle_connect_error(&message, random, now);
                Ok(self.apply_channel_actions(actions))
            },
            Packet::Message(SocketPacket::Disconnect) => Ok(self.handle_server_disconnect()),
            Packet::Message(SocketPacket::Event { name, data }) => {
                match ServerEvent::decode(&name, data) {
                    Ok(event) => Ok(self.handle_server_event(event)),
                    Err(ProtocolError::UnknownEvent(name)) => {
                        tracing::debug!(%name, "ignoring unknown event");
                        Ok(vec![])
                    },
                    Err(err) => Err(err.into()),
                }
            },
        }
    }

    fn handle_server_event(&mut self, event: ServerEvent) -> Vec<ClientAction> {
        tracing::trace!(event = event.event_name(), "server event");
        match event {
            ServerEvent::SessionConfig(user) => {
                self.session.apply_session_config(&user);
                vec![]
            },
            ServerEvent::ProfileUpdated(user) => self.handle_profile_updated(&user),
            ServerEvent::NearbyUsers(users) => {
                if self.session.settle_departures() {
                    tracing::debug!("room departure acknowledged");
                }
                self.presence.replace(users);
                vec![]
            },
            ServerEvent::RoomJoined(room) => self.handle_room_joined(room),
            ServerEvent::RoomUsers(users) => {
                if let Some(room) = self.room_or_stale("room_users") {
                    room.replace_roster(users);
                }
                vec![]
            },
            ServerEvent::ReceiveMessage(message) => {
                if let Some(room) = self.room_or_stale("receive_message") {
                    room.push_message(message);
                }
                vec![]
            },
            ServerEvent::UserTyping(update) => {
                if let Some(room) = self.room_or_stale("user_typing") {
                    room.apply_typing(update);
                }
                vec![]
            },
            ServerEvent::IncomingRequest(request) => {
                self.handle_incoming_request(request);
                vec![]
            },
            ServerEvent::ChatRejected(rejected) => self.handle_chat_rejected(rejected),
            ServerEvent::ChatEnded(ended) => self.handle_chat_ended(&ended),
            ServerEvent::Error(error) => {
                tracing::warn!(message = %error.message, "server error");
                self.server_error = Some(error.message.clone());
                self.server_error_timer.arm(self.env.now());
                vec![ClientAction::Notify(Notice::ServerError { message: error.message })]
            },
        }
    }

    fn handle_profile_updated(&mut self, user: &SessionUser) -> Vec<ClientAction> {
        let completed = self.session.apply_profile_updated(user);
        self.clear_server_error();

        if completed && self.room.is_none() {
            self.schedule_auto_match();
        }
        vec![]
    }

    fn handle_room_joined(&mut self, room: Room) -> Vec<ClientAction> {
        if let Some(previous) = &self.room {
            tracing::warn!(previous = previous.id(), next = %room.id, "joined a room while in another");
        }
        if self.session.settle_departures() {
            tracing::debug!(room = %room.id, "server placed us in a room after a local leave");
        }

        tracing::info!(room = %room.id, "room joined");
        self.negotiation.clear();
        self.typing.cancel();
        self.auto_match.cancel();
        self.clear_server_error();
        self.room = Some(ActiveRoom::new(room));
        vec![]
    }

    fn handle_incoming_request(&mut self, request: ChatRequest) {
        let declined = Optimistic::Declined { user_id: request.from.id.clone() };
        if self.session.settle(&declined) {
            tracing::debug!(from = %request.from.id, "declined user asked again");
        }
        tracing::debug!(from = %request.from.id, "incoming chat request");
        self.negotiation.receive(request);
    }

    fn handle_chat_rejected(&mut self, rejected: ChatRejected) -> Vec<ClientAction> {
        self.negotiation.rejected(&rejected.from_id);
        self.session.browse();
        vec![ClientAction::Notify(Notice::Rejected { from_id: rejected.from_id })]
    }

    fn handle_chat_ended(&mut self, ended: &ChatEnded) -> Vec<ClientAction> {
        tracing::info!(reason = ?ended.reason, auto_close = ended.auto_close, "chat ended");
        let mut actions = vec![ClientAction::Notify(Notice::ChatEnded { text: ended.notice_text() })];
        if self.room.is_some() {
            actions.extend(self.leave_room());
        }
        actions
    }

    /// Room to apply a room-scoped event to. Logs and returns `None` when the
    /// event arrived outside a room.
    fn room_or_stale(&mut self, event: &'static str) -> Option<&mut ActiveRoom> {
        if self.room.is_none() {
            if self.session.has_departure() {
                tracing::debug!(event, "dropping stale room event after leave");
            } else {
                tracing::warn!(event, "room event outside a room");
            }
        }
        self.room.as_mut()
    }

    fn handle_channel_closed(&mut self, reason: &str) -> Vec<ClientAction> {
        let random = self.env.random_unit();
        let actions = self.channel.handle_dropped(reason, random, self.env.now());
        self.apply_channel_actions(actions)
    }

    /// The server ended the namespace session. Socket.IO does not reconnect
    /// after a server-side disconnect.
    fn handle_server_disconnect(&mut self) -> Vec<ClientAction> {
        tracing::warn!("server closed the session");
        self.channel.close();
        self.reset_session();
        vec![
            ClientAction::CloseChannel,
            ClientAction::Notify(Notice::ConnectionLost { reason: "io server disconnect".into() }),
        ]
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let random = self.env.random_unit();
        let channel_actions = self.channel.tick(random, now);
        let mut actions = self.apply_channel_actions(channel_actions);

        if let Some(is_typing) = self.typing.poll(now)
            && self.room.is_some()
            && self.is_connected()
        {
            actions.push(ClientAction::Send(ClientCommand::Typing(is_typing)));
        }

        if self.auto_match.poll(now)
            && self.room.is_none()
            && self.is_connected()
            && self.session.start_matching().is_ok()
        {
            tracing::debug!("auto-match fired");
            actions.push(ClientAction::Send(ClientCommand::StartMatching));
        }

        if self.server_error_timer.poll(now) {
            self.server_error = None;
        }

        actions
    }

    fn handle_register_location(
        &mut self,
        lat: f64,
        lon: f64,
        radius: u32,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_connected("register_location")?;
        let registration = self.session.register_location(lat, lon, radius)?;
        Ok(vec![ClientAction::Send(ClientCommand::RegisterLocation(registration))])
    }

    fn handle_update_profile(
        &mut self,
        username: &str,
        gender: &str,
        interest: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_connected("update_profile")?;
        let profile = self.session.update_profile(username, gender, interest)?;
        Ok(vec![ClientAction::Send(ClientCommand::UpdateProfile(profile))])
    }

    fn handle_start_matching(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        self.require_connected("start_matching")?;
        self.session.start_matching()?;
        self.auto_match.cancel();
        Ok(vec![ClientAction::Send(ClientCommand::StartMatching)])
    }

    fn handle_refresh_nearby(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        self.require_connected("get_nearby_users")?;
        if !self.session.is_registered() {
            return Err(ClientError::InvalidState {
                stage: self.stage(),
                operation: "get_nearby_users",
            });
        }
        self.session.refreshed();
        Ok(vec![ClientAction::Send(ClientCommand::GetNearbyUsers)])
    }

    fn handle_request_chat(&mut self, target: String) -> Result<Vec<ClientAction>, ClientError> {
        self.require_connected("request_chat")?;
        if !self.session.is_registered() || self.room.is_some() {
            return Err(ClientError::InvalidState { stage: self.stage(), operation: "request_chat" });
        }

        if let Some(previous) = self.negotiation.request(target.clone()) {
            tracing::debug!(%previous, "outgoing request replaced");
        }
        Ok(vec![ClientAction::Send(ClientCommand::RequestChat(ChatTarget {
            target_user_id: target,
        }))])
    }

    fn handle_respond_chat(&mut self, accept: bool) -> Result<Vec<ClientAction>, ClientError> {
        self.require_connected("respond_chat")?;
        let stage = self.stage();
        let response = self
            .negotiation
            .respond(accept)
            .ok_or(ClientError::InvalidState { stage, operation: "respond_chat" })?;

        if !accept {
            self.session.record(Optimistic::Declined { user_id: response.target_user_id.clone() });
        }
        Ok(vec![ClientAction::Send(ClientCommand::RespondChat(response))])
    }

    fn handle_send_message(&mut self, text: String) -> Result<Vec<ClientAction>, ClientError> {
        self.require_connected("send_message")?;
        if self.room.is_none() {
            return Err(ClientError::InvalidState { stage: self.stage(), operation: "send_message" });
        }
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let mut actions = vec![ClientAction::Send(ClientCommand::SendMessage(text))];
        if let Some(is_typing) = self.typing.message_sent() {
            actions.push(ClientAction::Send(ClientCommand::Typing(is_typing)));
        }
        Ok(actions)
    }

    fn handle_input_changed(&mut self) -> Vec<ClientAction> {
        if self.room.is_none() || !self.is_connected() {
            return vec![];
        }
        self.typing
            .input_changed(self.env.now())
            .map(|is_typing| ClientAction::Send(ClientCommand::Typing(is_typing)))
            .into_iter()
            .collect()
    }

    fn handle_leave_room(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        self.require_connected("leave_room")?;
        if self.room.is_none() {
            return Err(ClientError::InvalidState { stage: self.stage(), operation: "leave_room" });
        }
        Ok(self.leave_room())
    }

    /// Leave the current room: emit `leave_room`, clear room state, return to
    /// browsing and ask for fresh presence.
    fn leave_room(&mut self) -> Vec<ClientAction> {
        let Some(room) = self.room.take() else {
            return vec![];
        };

        tracing::info!(room = room.id(), "leaving room");
        self.typing.cancel();
        self.session.record(Optimistic::LeftRoom { room_id: room.id().to_string() });
        self.session.browse();

        let mut actions = vec![ClientAction::Send(ClientCommand::LeaveRoom)];
        if self.session.identity().has_location() {
            actions.push(ClientAction::Send(ClientCommand::GetNearbyUsers));
        }
        self.schedule_auto_match();
        actions
    }

    fn handle_disconnect(&mut self) -> Vec<ClientAction> {
        tracing::info!("disconnecting");
        self.channel.close();
        self.reset_session();
        vec![ClientAction::CloseChannel]
    }

    fn apply_channel_actions(&mut self, actions: Vec<ChannelAction>) -> Vec<ClientAction> {
        let mut out = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                ChannelAction::Open => out.push(ClientAction::OpenChannel),
                ChannelAction::Close => out.push(ClientAction::CloseChannel),
                ChannelAction::ResetSession { reason } => {
                    self.reset_session();
                    out.push(ClientAction::Notify(Notice::ConnectionLost { reason }));
                },
                ChannelAction::Fatal(err) => {
                    self.reset_session();
                    out.push(ClientAction::Notify(Notice::ConnectionFailed {
                        reason: err.to_string(),
                    }));
                },
            }
        }
        out
    }

    /// Drop all state above the channel. The server does not resume
    /// sessions, so nothing survives a reconnect.
    fn reset_session(&mut self) {
        tracing::debug!(stage = ?self.stage(), "session reset");
        self.session = Session::new();
        self.presence.clear();
        self.negotiation.clear();
        self.room = None;
        self.typing.cancel();
        self.auto_match.cancel();
        self.clear_server_error();
    }

    fn schedule_auto_match(&mut self) {
        if self.config.session.auto_match && self.is_connected() {
            self.auto_match.arm(self.env.now());
        }
    }

    fn clear_server_error(&mut self) {
        self.server_error = None;
        self.server_error_timer.cancel();
    }

    fn require_connected(&self, operation: &'static str) -> Result<(), ClientError> {
        if self.is_connected() { Ok(()) } else { Err(ClientError::NotConnected { operation }) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use aroundu_core::{ChannelState, env::test_utils::MockEnv};
    use aroundu_proto::Handshake;

    use super::*;

    fn connected_client() -> (Client<MockEnv>, MockEnv) {
        let env = MockEnv::new();
        let mut client = Client::new(env.clone(), ClientConfig::default());
        client.handle(ClientEvent::Connect).unwrap();
        client
            .handle(ClientEvent::PacketReceived(Packet::Message(SocketPacket::Connect {
                sid: Some("s1".into()),
            })))
            .unwrap();
        (client, env)
    }

    #[test]
    fn connect_opens_channel() {
        let env = MockEnv::new();
        let mut client = Client::new(env, ClientConfig::default());

        let actions = client.handle(ClientEvent::Connect).unwrap();
        assert_eq!(actions, vec![ClientAction::OpenChannel]);
        assert_eq!(client.channel().state(), ChannelState::Connecting { attempt: 0 });
    }

    #[test]
    fn engine_open_joins_namespace_and_pings_are_answered() {
        let env = MockEnv::new();
        let mut client = Client::new(env, ClientConfig::default());
        client.handle(ClientEvent::Connect).unwrap();

        let handshake = Handshake {
            sid: "e1".into(),
            upgrades: vec![],
            ping_interval: 25_000,
            ping_timeout: 20_000,
            max_payload: Some(1_000_000),
        };
        let actions = client.handle(ClientEvent::PacketReceived(Packet::Open(handshake))).unwrap();
        assert_eq!(actions, vec![ClientAction::SendPacket(Packet::connect())]);
        assert_eq!(client.channel().liveness_window(), Some(Duration::from_secs(45)));

        let actions = client.handle(ClientEvent::PacketReceived(Packet::Ping)).unwrap();
        assert_eq!(actions, vec![ClientAction::SendPacket(Packet::Pong)]);
    }

    #[test]
    fn commands_require_connection() {
        let env = MockEnv::new();
        let mut client = Client::new(env, ClientConfig::default());

        let result =
            client.handle(ClientEvent::RegisterLocation { lat: 1.0, lon: 1.0, radius: 1000 });
        assert_eq!(result, Err(ClientError::NotConnected { operation: "register_location" }));
    }

    #[test]
    fn unknown_events_are_ignored() {
        let (mut client, _env) = connected_client();
        let packet = Packet::event("server_stats", Some(serde_json::json!({ "online": 3 })));

        let actions = client.handle(ClientEvent::PacketReceived(packet)).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let (mut client, _env) = connected_client();
        let packet = Packet::event("room_joined", Some(serde_json::json!({ "nope": 1 })));

        let result = client.handle(ClientEvent::PacketReceived(packet));
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }

    #[test]
    fn server_error_clears_after_ttl() {
        let (mut client, env) = connected_client();
        let actions = client
            .handle(ClientEvent::Server(ServerEvent::Error(aroundu_proto::ErrorPayload::new(
                "Room is full",
            ))))
            .unwrap();

        assert_eq!(actions, vec![ClientAction::Notify(Notice::ServerError {
            message: "Room is full".into()
        })]);
        assert_eq!(client.server_error(), Some("Room is full"));
        assert_eq!(client.stage(), Stage::Anonymous);

        env.advance(Duration::from_millis(2999));
        client.handle(ClientEvent::Tick { now: env.now() }).unwrap();
        assert_eq!(client.server_error(), Some("Room is full"));

        env.advance(Duration::from_millis(1));
        client.handle(ClientEvent::Tick { now: env.now() }).unwrap();
        assert_eq!(client.server_error(), None);
    }

    #[test]
    fn server_disconnect_does_not_reconnect() {
        let (mut client, env) = connected_client();
        client.handle(ClientEvent::RegisterLocation { lat: 1.0, lon: 2.0, radius: 500 }).unwrap();

        let actions =
            client.handle(ClientEvent::PacketReceived(Packet::Message(SocketPacket::Disconnect))).unwrap();
        assert_eq!(actions[0], ClientAction::CloseChannel);
        assert_eq!(client.channel().state(), ChannelState::Closed);
        assert_eq!(client.stage(), Stage::Anonymous);

        env.advance(Duration::from_secs(60));
        assert!(client.handle(ClientEvent::Tick { now: env.now() }).unwrap().is_empty());
    }
}
