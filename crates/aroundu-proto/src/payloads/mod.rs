//! Typed event payloads.
//!
//! Socket.IO events are untyped `(name, json)` pairs on the wire. This module
//! maps them onto two closed enums: [`ClientCommand`] for everything the client
//! emits and [`ServerEvent`] for everything the server pushes.
//!
//! # Invariants
//!
//! Each variant maps to exactly one event name (enforced by match
//! exhaustiveness). Decoding an encoded value yields the same value.

pub mod negotiation;
pub mod presence;
pub mod room;
pub mod session;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    Packet, SocketPacket,
    errors::{ProtocolError, Result},
};

/// Outbound event emitted by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Publish the (rounded) location and discovery radius.
    RegisterLocation(session::LocationRegistration),
    /// Publish the profile.
    UpdateProfile(session::ProfileUpdate),
    /// Ask the server to pair this session with a partner.
    StartMatching,
    /// Ask for a fresh presence snapshot.
    GetNearbyUsers,
    /// Invite a nearby user.
    RequestChat(negotiation::ChatTarget),
    /// Answer an incoming invitation.
    RespondChat(negotiation::ChatResponse),
    /// Post raw text to the current room.
    SendMessage(String),
    /// Local typing state changed.
    Typing(bool),
    /// Leave the current room.
    LeaveRoom,
}

/// Inbound event pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Session identity assigned on connect.
    SessionConfig(session::SessionUser),
    /// Profile stored; registration complete.
    ProfileUpdated(session::SessionUser),
    /// Presence snapshot.
    NearbyUsers(Vec<presence::NearbyUser>),
    /// Session placed in a room.
    RoomJoined(room::Room),
    /// Room roster.
    RoomUsers(Vec<room::RoomUser>),
    /// Room message.
    ReceiveMessage(room::ChatMessage),
    /// Remote typing state.
    UserTyping(room::TypingUpdate),
    /// Someone wants to chat.
    IncomingRequest(negotiation::ChatRequest),
    /// Outgoing invitation declined, or target busy or unreachable.
    ChatRejected(negotiation::ChatRejected),
    /// Room terminated by the partner or the server.
    ChatEnded(negotiation::ChatEnded),
    /// Business error.
    Error(ErrorPayload),
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable error message.
    pub message: String,
}

impl ErrorPayload {
    /// Create an error payload.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl ClientCommand {
    /// Socket.IO event name.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::RegisterLocation(_) => "register_location",
            Self::UpdateProfile(_) => "update_profile",
            Self::StartMatching => "start_matching",
            Self::GetNearbyUsers => "get_nearby_users",
            Self::RequestChat(_) => "request_chat",
            Self::RespondChat(_) => "respond_chat",
            Self::SendMessage(_) => "send_message",
            Self::Typing(_) => "typing",
            Self::LeaveRoom => "leave_room",
        }
    }

    /// JSON argument. `None` for argument-less events.
    pub fn payload(&self) -> Result<Option<Value>> {
        Ok(match self {
            Self::RegisterLocation(p) => Some(serde_json::to_value(p)?),
            Self::UpdateProfile(p) => Some(serde_json::to_value(p)?),
            Self::RequestChat(p) => Some(serde_json::to_value(p)?),
            Self::RespondChat(p) => Some(serde_json::to_value(p)?),
            Self::SendMessage(text) => Some(Value::String(text.clone())),
            Self::Typing(is_typing) => Some(Value::Bool(*is_typing)),
            Self::StartMatching | Self::GetNearbyUsers | Self::LeaveRoom => None,
        })
    }

    /// Wrap into an event packet.
    pub fn into_packet(self) -> Result<Packet> {
        let data = self.payload()?;
        Ok(Packet::event(self.event_name(), data))
    }

    /// Decode an event received by a server.
    pub fn decode(name: &str, data: Option<Value>) -> Result<Self> {
        match name {
            "register_location" => Ok(Self::RegisterLocation(parse(name, data)?)),
            "update_profile" => Ok(Self::UpdateProfile(parse(name, data)?)),
            "start_matching" => Ok(Self::StartMatching),
            "get_nearby_users" => Ok(Self::GetNearbyUsers),
            "request_chat" => Ok(Self::RequestChat(parse(name, data)?)),
            "respond_chat" => Ok(Self::RespondChat(parse(name, data)?)),
            "send_message" => Ok(Self::SendMessage(parse(name, data)?)),
            "typing" => Ok(Self::Typing(parse(name, data)?)),
            "leave_room" => Ok(Self::LeaveRoom),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Decode from a packet. `Ok(None)` for non-event packets.
    pub fn from_packet(packet: Packet) -> Result<Option<Self>> {
        match packet {
            Packet::Message(SocketPacket::Event { name, data }) => {
                Self::decode(&name, data).map(Some)
            },
            _ => Ok(None),
        }
    }
}

impl ServerEvent {
    /// Socket.IO event name.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::SessionConfig(_) => "session_config",
            Self::ProfileUpdated(_) => "profile_updated",
            Self::NearbyUsers(_) => "nearby_users",
            Self::RoomJoined(_) => "room_joined",
            Self::RoomUsers(_) => "room_users",
            Self::ReceiveMessage(_) => "receive_message",
            Self::UserTyping(_) => "user_typing",
            Self::IncomingRequest(_) => "incoming_request",
            Self::ChatRejected(_) => "chat_rejected",
            Self::ChatEnded(_) => "chat_ended",
            Self::Error(_) => "error",
        }
    }

    /// JSON argument as the server sends it.
    pub fn payload(&self) -> Result<Value> {
        Ok(match self {
            Self::SessionConfig(user) | Self::ProfileUpdated(user) => {
                serde_json::to_value(session::UserEnvelope { user: user.clone() })?
            },
            Self::NearbyUsers(users) => {
                serde_json::to_value(presence::NearbyUsers { users: users.clone() })?
            },
            Self::RoomJoined(room) => serde_json::to_value(room::RoomJoined { room: room.clone() })?,
            Self::RoomUsers(users) => serde_json::to_value(room::RoomUsers { users: users.clone() })?,
            Self::ReceiveMessage(message) => serde_json::to_value(message)?,
            Self::UserTyping(update) => serde_json::to_value(update)?,
            Self::IncomingRequest(request) => serde_json::to_value(request)?,
            Self::ChatRejected(rejected) => serde_json::to_value(rejected)?,
            Self::ChatEnded(ended) => serde_json::to_value(ended)?,
            Self::Error(error) => serde_json::to_value(error)?,
        })
    }

    /// Wrap into an event packet.
    pub fn to_packet(&self) -> Result<Packet> {
        Ok(Packet::event(self.event_name(), Some(self.payload()?)))
    }

    /// Decode an event pushed by the server.
    pub fn decode(name: &str, data: Option<Value>) -> Result<Self> {
        match name {
            "session_config" => {
                Ok(Self::SessionConfig(parse::<session::UserEnvelope>(name, data)?.user))
            },
            "profile_updated" => {
                Ok(Self::ProfileUpdated(parse::<session::UserEnvelope>(name, data)?.user))
            },
            "nearby_users" => {
                Ok(Self::NearbyUsers(parse::<presence::NearbyUsers>(name, data)?.users))
            },
            "room_joined" => Ok(Self::RoomJoined(parse::<room::RoomJoined>(name, data)?.room)),
            "room_users" => Ok(Self::RoomUsers(parse::<room::RoomUsers>(name, data)?.users)),
            "receive_message" => Ok(Self::ReceiveMessage(parse(name, data)?)),
            "user_typing" => Ok(Self::UserTyping(parse(name, data)?)),
            "incoming_request" => Ok(Self::IncomingRequest(parse(name, data)?)),
            "chat_rejected" => Ok(Self::ChatRejected(parse(name, data)?)),
            "chat_ended" => {
                let data = data.or_else(|| Some(Value::Object(serde_json::Map::new())));
                Ok(Self::ChatEnded(parse(name, data)?))
            },
            "error" => Ok(Self::Error(parse(name, data)?)),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Decode from a packet. `Ok(None)` for non-event packets.
    pub fn from_packet(packet: Packet) -> Result<Option<Self>> {
        match packet {
            Packet::Message(SocketPacket::Event { name, data }) => {
                Self::decode(&name, data).map(Some)
            },
            _ => Ok(None),
        }
    }
}

fn parse<T: DeserializeOwned>(event: &str, data: Option<Value>) -> Result<T> {
    let value = data.ok_or_else(|| ProtocolError::UnexpectedPayload {
        event: event.to_string(),
        reason: "missing payload".to_string(),
    })?;

    serde_json::from_value(value).map_err(|e| ProtocolError::UnexpectedPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn commands_use_camel_case_fields() {
        let command = ClientCommand::RespondChat(negotiation::ChatResponse {
            target_user_id: "u5".into(),
            accept: true,
        });
        assert_eq!(
            command.payload().unwrap(),
            Some(json!({ "targetUserId": "u5", "accept": true }))
        );

        // Field order on the wire is not significant.
        let encoded = command.into_packet().unwrap().encode().unwrap();
        let body = encoded.strip_prefix("42").unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(body).unwrap(),
            json!(["respond_chat", { "targetUserId": "u5", "accept": true }])
        );
    }

    #[test]
    fn send_message_is_a_bare_string() {
        let packet = ClientCommand::SendMessage("hello there".into()).into_packet().unwrap();
        assert_eq!(packet.encode().unwrap(), r#"42["send_message","hello there"]"#);
    }

    #[test]
    fn decodes_session_config() {
        let event =
            ServerEvent::decode("session_config", Some(json!({ "user": { "id": "abc" } })))
                .unwrap();
        assert_eq!(event, ServerEvent::SessionConfig(session::SessionUser::new("abc")));
    }

    #[test]
    fn decodes_message_without_timestamp() {
        let event =
            ServerEvent::decode("receive_message", Some(json!({ "userId": "u2", "text": "hi" })))
                .unwrap();
        let ServerEvent::ReceiveMessage(message) = event else {
            panic!("expected receive_message, got {event:?}");
        };
        assert_eq!(message.user_id, "u2");
        assert_eq!(message.text, "hi");
    }

    #[test]
    fn decodes_chat_ended_without_payload() {
        let event = ServerEvent::decode("chat_ended", None).unwrap();
        assert!(matches!(event, ServerEvent::ChatEnded(negotiation::ChatEnded {
            reason: None,
            auto_close: false
        })));
    }

    #[test]
    fn rejects_unknown_and_mismatched_events() {
        assert_eq!(
            ServerEvent::decode("spam", None),
            Err(ProtocolError::UnknownEvent("spam".into()))
        );
        assert!(matches!(
            ServerEvent::decode("user_typing", Some(json!({ "userId": 7 }))),
            Err(ProtocolError::UnexpectedPayload { .. })
        ));
        assert!(matches!(
            ServerEvent::decode("nearby_users", None),
            Err(ProtocolError::UnexpectedPayload { .. })
        ));
    }

    #[test]
    fn non_event_packets_are_skipped() {
        assert_eq!(ServerEvent::from_packet(Packet::Ping), Ok(None));
        assert_eq!(ClientCommand::from_packet(Packet::connect()), Ok(None));
    }
}
