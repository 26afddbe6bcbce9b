//! In-memory AroundU server for deterministic tests.
//!
//! `SimServer` speaks the same Engine.IO/Socket.IO packets as the real
//! backend but keeps every session in memory and delivers through per-session
//! outboxes, so tests decide exactly when each packet arrives.
//!
//! Brokering rules are deliberately simple:
//! - discovery and matching use great-circle distance against the radius of
//!   both parties
//! - rooms are one-to-one and end as soon as either side leaves or drops
//! - every pending request is tracked until answered, until either side goes
//!   away, or until either side enters a room (the requester is then told the
//!   target is busy)

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    time::Duration,
};

use aroundu_app::Inbound;
use aroundu_core::Environment;
use aroundu_proto::{
    ClientCommand, ErrorPayload, Handshake, Packet, RoomId, ServerEvent, SocketPacket, UserId,
    payloads::{
        negotiation::{ChatEnded, ChatRejected, ChatRequest, ChatResponse, ChatTarget, RequestPeer},
        presence::NearbyUser,
        room::{ChatMessage, MessageKind, Room, RoomUser, TypingUpdate},
        session::{LocationRegistration, ProfileUpdate, SessionUser},
    },
};
use chrono::{DateTime, Utc};

use crate::{SimEnv, SimInstant};

/// Server-side connection handle.
pub type SessionId = u64;

/// Wall-clock time at simulation start, in epoch milliseconds.
const EPOCH_START_MS: i64 = 1_700_000_000_000;

const PING_INTERVAL_MS: u64 = 25_000;
const PING_TIMEOUT_MS: u64 = 20_000;
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn distance_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lat2) = (a.0.to_radians(), b.0.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.1 - a.1).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

#[derive(Debug, Clone)]
struct User {
    id: UserId,
    location: Option<LocationRegistration>,
    username: Option<String>,
    gender: Option<String>,
    interest: Option<String>,
    namespace_open: bool,
    matching: bool,
    room: Option<RoomId>,
}

impl User {
    fn new(id: UserId) -> Self {
        Self {
            id,
            location: None,
            username: None,
            gender: None,
            interest: None,
            namespace_open: false,
            matching: false,
            room: None,
        }
    }

    fn is_registered(&self) -> bool {
        self.location.is_some() && self.username.is_some()
    }

    fn display_name(&self) -> String {
        self.username.clone().unwrap_or_default()
    }

    fn avatar(&self) -> String {
        self.username
            .as_deref()
            .and_then(|name| name.chars().next())
            .map_or_else(|| "?".to_string(), |c| c.to_uppercase().collect())
    }

    fn to_session_user(&self) -> SessionUser {
        let mut user = SessionUser::new(self.id.clone());
        user.lat = self.location.map(|l| l.lat);
        user.lon = self.location.map(|l| l.lon);
        user.radius = self.location.map(|l| l.radius);
        user.username.clone_from(&self.username);
        user.gender.clone_from(&self.gender);
        user.interest.clone_from(&self.interest);
        user.avatar = self.username.as_ref().map(|_| self.avatar());
        user
    }

    fn point(&self) -> Option<(f64, f64)> {
        self.location.map(|l| (l.lat, l.lon))
    }
}

/// Simulation server.
pub struct SimServer {
    env: SimEnv,
    users: BTreeMap<SessionId, User>,
    by_user: BTreeMap<UserId, SessionId>,
    outboxes: BTreeMap<SessionId, VecDeque<Inbound>>,
    rooms: BTreeMap<RoomId, Vec<SessionId>>,
    /// Pending requests as (target, requester).
    requests: BTreeSet<(SessionId, SessionId)>,
    next_session: SessionId,
    next_room: u64,
    reachable: bool,
    /// When the next heartbeat goes out.
    next_ping: SimInstant,
}

impl SimServer {
    /// Create a server sharing the simulation clock.
    pub fn new(env: SimEnv) -> Self {
        Self {
            env,
            users: BTreeMap::new(),
            by_user: BTreeMap::new(),
            outboxes: BTreeMap::new(),
            rooms: BTreeMap::new(),
            requests: BTreeSet::new(),
            next_session: 1,
            next_room: 1,
            reachable: true,
            next_ping: SimInstant::ZERO + Duration::from_millis(PING_INTERVAL_MS),
        }
    }

    /// Make new connections succeed or fail.
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Whether new connections are accepted.
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Accept a transport connection. `None` while unreachable.
    ///
    /// The Engine.IO handshake is queued immediately.
    pub fn accept(&mut self) -> Option<SessionId> {
        if !self.reachable {
            return None;
        }
        let session = self.next_session;
        self.next_session += 1;

        let user = User::new(format!("u{session}"));
        self.by_user.insert(user.id.clone(), session);
        self.users.insert(session, user);
        self.outboxes.insert(session, VecDeque::new());

        self.push(
            session,
            Packet::Open(Handshake {
                sid: format!("eio-{session}"),
                upgrades: Vec::new(),
                ping_interval: PING_INTERVAL_MS,
                ping_timeout: PING_TIMEOUT_MS,
                max_payload: Some(1_000_000),
            }),
        );
        tracing::debug!(session, "accepted");
        Some(session)
    }

    /// Next item for a session, in delivery order.
    pub fn poll(&mut self, session: SessionId) -> Option<Inbound> {
        let outbox = self.outboxes.get_mut(&session)?;
        let next = outbox.pop_front();
        if outbox.is_empty() && !self.users.contains_key(&session) {
            self.outboxes.remove(&session);
        }
        next
    }

    /// Whether anything is waiting for a session.
    pub fn has_pending(&self, session: SessionId) -> bool {
        self.outboxes.get(&session).is_some_and(|outbox| !outbox.is_empty())
    }

    /// The client closed its transport.
    pub fn close(&mut self, session: SessionId) {
        if self.users.contains_key(&session) {
            self.disconnect(session);
            self.outboxes.remove(&session);
        }
    }

    /// The network dropped the connection. The client sees the transport
    /// close; partners see `partner_disconnected`.
    pub fn drop_session(&mut self, session: SessionId, reason: &str) {
        if self.users.contains_key(&session) {
            self.disconnect(session);
            self.close_transport(session, reason);
        }
    }

    /// The server ends the session with a namespace disconnect.
    pub fn kick(&mut self, session: SessionId) {
        if self.users.contains_key(&session) {
            self.push(session, Packet::Message(SocketPacket::Disconnect));
            self.disconnect(session);
            self.close_transport(session, "io server disconnect");
        }
    }

    /// Send the Engine.IO heartbeat to every session once per ping interval.
    pub fn tick(&mut self) {
        let now = self.env.now();
        if now < self.next_ping {
            return;
        }
        self.next_ping = now + Duration::from_millis(PING_INTERVAL_MS);
        let sessions: Vec<SessionId> = self.users.keys().copied().collect();
        for session in sessions {
            self.push(session, Packet::Ping);
        }
    }

    /// Push an arbitrary event to a session.
    pub fn inject(&mut self, session: SessionId, event: &ServerEvent) {
        self.emit(session, event);
    }

    /// Handle a packet written by a client.
    pub fn receive(&mut self, session: SessionId, packet: Packet) {
        let Some(user) = self.users.get_mut(&session) else {
            tracing::debug!(session, "packet for unknown session");
            return;
        };

        match packet {
            Packet::Message(SocketPacket::Connect { .. }) => {
                user.namespace_open = true;
                let sid = format!("sock-{session}");
                let config = ServerEvent::SessionConfig(SessionUser::new(user.id.clone()));
                self.push(session, Packet::Message(SocketPacket::Connect { sid: Some(sid) }));
                self.emit(session, &config);
            },
            Packet::Message(SocketPacket::Disconnect) | Packet::Close => self.close(session),
            Packet::Message(SocketPacket::Event { .. }) if user.namespace_open => {
                match ClientCommand::from_packet(packet) {
                    Ok(Some(command)) => self.handle_command(session, command),
                    Ok(None) => {},
                    Err(e) => {
                        tracing::warn!(session, error = %e, "undecodable command");
                        self.error(session, "Malformed event");
                    },
                }
            },
            Packet::Ping => self.push(session, Packet::Pong),
            other => tracing::trace!(session, packet = ?other, "ignored"),
        }
    }

    fn handle_command(&mut self, session: SessionId, command: ClientCommand) {
        tracing::debug!(session, event = command.event_name(), "command");
        match command {
            ClientCommand::RegisterLocation(location) => self.register_location(session, location),
            ClientCommand::UpdateProfile(profile) => self.update_profile(session, profile),
            ClientCommand::StartMatching => self.start_matching(session),
            ClientCommand::GetNearbyUsers => self.send_nearby(session),
            ClientCommand::RequestChat(target) => self.request_chat(session, &target),
            ClientCommand::RespondChat(response) => self.respond_chat(session, &response),
            ClientCommand::SendMessage(text) => self.send_message(session, text),
            ClientCommand::Typing(is_typing) => self.typing(session, is_typing),
            ClientCommand::LeaveRoom => self.leave_room(session),
        }
    }

    fn register_location(&mut self, session: SessionId, location: LocationRegistration) {
        let Some(user) = self.users.get_mut(&session) else { return };
        user.location = Some(location);
        let config = ServerEvent::SessionConfig(user.to_session_user());
        self.emit(session, &config);
    }

    fn update_profile(&mut self, session: SessionId, profile: ProfileUpdate) {
        let Some(user) = self.users.get_mut(&session) else { return };
        if user.location.is_none() {
            self.error(session, "Register your location first");
            return;
        }
        let username = profile.username.trim();
        if username.is_empty() {
            self.error(session, "Username is required");
            return;
        }
        user.username = Some(username.to_string());
        user.gender = Some(profile.gender);
        user.interest = Some(profile.interest);
        let updated = ServerEvent::ProfileUpdated(user.to_session_user());
        self.emit(session, &updated);
    }

    fn start_matching(&mut self, session: SessionId) {
        let Some(user) = self.users.get_mut(&session) else { return };
        if !user.is_registered() {
            self.error(session, "Complete your profile first");
            return;
        }
        if user.room.is_some() {
            return;
        }
        user.matching = true;

        let partner = self
            .users
            .iter()
            .filter(|(id, other)| **id != session && other.matching && other.room.is_none())
            .map(|(id, _)| *id)
            .find(|id| self.within_reach(session, *id));

        if let Some(partner) = partner {
            self.open_room(partner, session);
        }
    }

    fn send_nearby(&mut self, session: SessionId) {
        let users = self.nearby(session);
        self.emit(session, &ServerEvent::NearbyUsers(users));
    }

    fn request_chat(&mut self, session: SessionId, target: &ChatTarget) {
        let Some(requester) = self.users.get(&session) else { return };
        if requester.room.is_some() {
            self.error(session, "Leave the current room first");
            return;
        }

        let available = self.by_user.get(&target.target_user_id).copied().filter(|&target| {
            target != session
                && self.users.get(&target).is_some_and(|t| t.is_registered() && t.room.is_none())
        });
        let Some(target_session) = available else {
            let rejected = ChatRejected { from_id: target.target_user_id.clone() };
            self.emit(session, &ServerEvent::ChatRejected(rejected));
            return;
        };

        self.requests.insert((target_session, session));
        let from = RequestPeer {
            id: requester.id.clone(),
            username: requester.display_name(),
            avatar: requester.avatar(),
            distance: self.distance_between(session, target_session).map(f64::round),
        };
        self.emit(target_session, &ServerEvent::IncomingRequest(ChatRequest { from }));
    }

    fn respond_chat(&mut self, session: SessionId, response: &ChatResponse) {
        let Some(requester) = self.by_user.get(&response.target_user_id).copied() else {
            self.error(session, "Request is no longer available");
            return;
        };
        if !self.requests.remove(&(session, requester)) {
            self.error(session, "Request is no longer available");
            return;
        }

        let free = |id: &SessionId| self.users.get(id).is_some_and(|u| u.room.is_none());
        if response.accept && free(&session) && free(&requester) {
            self.open_room(requester, session);
        } else if let Some(responder) = self.users.get(&session) {
            let rejected = ChatRejected { from_id: responder.id.clone() };
            self.emit(requester, &ServerEvent::ChatRejected(rejected));
        }
    }

    fn send_message(&mut self, session: SessionId, text: String) {
        let Some(user) = self.users.get(&session) else { return };
        let Some(room) = user.room.clone() else {
            self.error(session, "Not in a room");
            return;
        };
        let message = ChatMessage {
            user_id: user.id.clone(),
            username: user.display_name(),
            text,
            timestamp: self.timestamp(),
            kind: MessageKind::Chat,
        };
        for member in self.members(&room) {
            self.emit(member, &ServerEvent::ReceiveMessage(message.clone()));
        }
    }

    fn typing(&mut self, session: SessionId, is_typing: bool) {
        let Some(user) = self.users.get(&session) else { return };
        let Some(room) = user.room.clone() else { return };
        let update = TypingUpdate { user_id: user.id.clone(), is_typing };
        for member in self.members(&room).into_iter().filter(|&m| m != session) {
            self.emit(member, &ServerEvent::UserTyping(update.clone()));
        }
    }

    fn leave_room(&mut self, session: SessionId) {
        let room = self.users.get(&session).and_then(|u| u.room.clone());
        if let Some(room) = room {
            self.end_room(&room, session, ChatEnded::PARTNER_LEFT);
        }
    }

    fn open_room(&mut self, a: SessionId, b: SessionId) {
        let id = format!("r{}", self.next_room);
        self.next_room += 1;

        let radius = [a, b]
            .iter()
            .filter_map(|s| self.users.get(s).and_then(|u| u.location).map(|l| l.radius))
            .min();
        let mut roster = Vec::with_capacity(2);
        for session in [a, b] {
            if let Some(user) = self.users.get_mut(&session) {
                user.room = Some(id.clone());
                user.matching = false;
                roster.push(RoomUser {
                    id: user.id.clone(),
                    username: user.display_name(),
                    avatar: Some(user.avatar()),
                });
            }
        }
        // Requests still waiting on either party can no longer be accepted
        let stranded: Vec<(SessionId, SessionId)> = self
            .requests
            .iter()
            .copied()
            .filter(|(t, r)| [a, b].contains(t) || [a, b].contains(r))
            .collect();
        for (target, requester) in stranded {
            self.requests.remove(&(target, requester));
            let target_id = self.user_id(target).map(String::from);
            if let Some(from_id) = target_id.filter(|_| ![a, b].contains(&requester)) {
                self.emit(requester, &ServerEvent::ChatRejected(ChatRejected { from_id }));
            }
        }
        self.rooms.insert(id.clone(), vec![a, b]);
        tracing::debug!(room = %id, a, b, "room opened");

        let room = Room { id, radius };
        for session in [a, b] {
            self.emit(session, &ServerEvent::RoomJoined(room.clone()));
            self.emit(session, &ServerEvent::RoomUsers(roster.clone()));
        }
    }

    fn end_room(&mut self, room: &RoomId, leaver: SessionId, reason: &str) {
        let members = self.rooms.remove(room).unwrap_or_default();
        tracing::debug!(room = %room, leaver, reason, "room ended");
        for member in members {
            if let Some(user) = self.users.get_mut(&member) {
                user.room = None;
            }
            if member != leaver {
                let ended = ChatEnded { reason: Some(reason.to_string()), auto_close: false };
                self.emit(member, &ServerEvent::ChatEnded(ended));
            }
        }
    }

    fn disconnect(&mut self, session: SessionId) {
        let room = self.users.get(&session).and_then(|u| u.room.clone());
        if let Some(room) = room {
            self.end_room(&room, session, ChatEnded::PARTNER_DISCONNECTED);
        }
        self.requests.retain(|(t, r)| *t != session && *r != session);
        if let Some(user) = self.users.remove(&session) {
            self.by_user.remove(&user.id);
            tracing::debug!(session, user = %user.id, "disconnected");
        }
    }

    fn close_transport(&mut self, session: SessionId, reason: &str) {
        if let Some(outbox) = self.outboxes.get_mut(&session) {
            outbox.push_back(Inbound::Closed { reason: reason.to_string() });
        }
    }

    fn nearby(&self, session: SessionId) -> Vec<NearbyUser> {
        let Some(radius) = self.users.get(&session).and_then(|u| u.location).map(|l| l.radius)
        else {
            return Vec::new();
        };

        let mut users: Vec<NearbyUser> = self
            .users
            .iter()
            .filter(|(id, other)| **id != session && other.is_registered() && other.room.is_none())
            .filter_map(|(id, other)| {
                let distance = self.distance_between(session, *id)?;
                (distance <= f64::from(radius)).then(|| NearbyUser {
                    id: other.id.clone(),
                    username: other.display_name(),
                    avatar: other.avatar(),
                    distance: distance.round(),
                })
            })
            .collect();
        users.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        users
    }

    fn distance_between(&self, a: SessionId, b: SessionId) -> Option<f64> {
        let a = self.users.get(&a)?.point()?;
        let b = self.users.get(&b)?.point()?;
        Some(distance_m(a, b))
    }

    fn within_reach(&self, a: SessionId, b: SessionId) -> bool {
        let radius = |s: SessionId| self.users.get(&s).and_then(|u| u.location).map(|l| l.radius);
        match (self.distance_between(a, b), radius(a), radius(b)) {
            (Some(distance), Some(ra), Some(rb)) => distance <= f64::from(ra.min(rb)),
            _ => false,
        }
    }

    fn members(&self, room: &RoomId) -> Vec<SessionId> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let elapsed = self.env.now().since_start().as_millis() as i64;
        DateTime::from_timestamp_millis(EPOCH_START_MS + elapsed).unwrap_or_default()
    }

    fn error(&mut self, session: SessionId, message: &str) {
        self.emit(session, &ServerEvent::Error(ErrorPayload::new(message)));
    }

    fn emit(&mut self, session: SessionId, event: &ServerEvent) {
        match event.to_packet() {
            Ok(packet) => self.push(session, packet),
            Err(e) => tracing::warn!(session, event = event.event_name(), error = %e, "encode failed"),
        }
    }

    fn push(&mut self, session: SessionId, packet: Packet) {
        if let Some(outbox) = self.outboxes.get_mut(&session) {
            outbox.push_back(Inbound::Packet(packet));
        }
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.users.len()
    }

    /// User id of a live session.
    pub fn user_id(&self, session: SessionId) -> Option<&str> {
        self.users.get(&session).map(|u| u.id.as_str())
    }

    /// Session of a live user.
    pub fn session_of(&self, user_id: &str) -> Option<SessionId> {
        self.by_user.get(user_id).copied()
    }

    /// Room a user is in, if any.
    pub fn room_of(&self, user_id: &str) -> Option<&str> {
        let session = self.by_user.get(user_id)?;
        self.users.get(session)?.room.as_deref()
    }

    /// Open rooms with their member ids.
    pub fn rooms(&self) -> BTreeMap<RoomId, Vec<UserId>> {
        self.rooms
            .iter()
            .map(|(id, members)| {
                let ids = members.iter().filter_map(|m| self.user_id(*m)).map(String::from);
                (id.clone(), ids.collect())
            })
            .collect()
    }

    /// Number of pending chat requests.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }
}
