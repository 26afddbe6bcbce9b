//! Room, roster, message and typing payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{RoomId, UserId};

/// A server-assigned chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room id.
    pub id: RoomId,
    /// Radius context the room was matched in, in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<u32>,
}

/// `room_joined` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoined {
    /// Room the session was placed in.
    pub room: Room,
}

/// Room participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUser {
    /// Participant id.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub username: String,
    /// Avatar glyph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// `room_users` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUsers {
    /// Full roster. Replaces any previous one.
    pub users: Vec<RoomUser>,
}

/// Message origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Sent by a participant.
    #[default]
    Chat,
    /// Generated by the server (joins, leaves).
    System,
}

/// `receive_message` payload.
///
/// The client only sends raw text; the server attaches id, username and
/// timestamp before broadcasting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Author id. Empty for some system messages.
    #[serde(default)]
    pub user_id: UserId,
    /// Author display name.
    #[serde(default)]
    pub username: String,
    /// Message text.
    pub text: String,
    /// Server timestamp. Falls back to the arrival time when omitted.
    #[serde(with = "timestamp", default = "timestamp::arrival")]
    pub timestamp: DateTime<Utc>,
    /// Message origin.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

/// `user_typing` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUpdate {
    /// Participant whose typing state changed.
    pub user_id: UserId,
    /// New typing state.
    pub is_typing: bool,
}

/// Timestamps arrive either as epoch milliseconds or as RFC 3339 strings.
/// They are always written back as epoch milliseconds.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Fractional(f64),
        Text(String),
    }

    /// Stand-in for a message the server sent without a timestamp.
    #[allow(clippy::disallowed_methods)]
    pub fn arrival() -> DateTime<Utc> {
        Utc::now()
    }

    /// Serialize as epoch milliseconds.
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.timestamp_millis())
    }

    /// Deserialize from epoch milliseconds or an RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let millis = match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => ms,
            Raw::Fractional(ms) => ms as i64,
            Raw::Text(text) => {
                return DateTime::parse_from_rfc3339(&text)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(D::Error::custom);
            },
        };

        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {millis}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_accepts_millisecond_timestamps() {
        let message: ChatMessage = serde_json::from_value(json!({
            "userId": "u2",
            "username": "Noor",
            "text": "hi",
            "timestamp": 1_700_000_000_000_i64,
            "type": "chat",
        }))
        .unwrap();

        assert_eq!(message.user_id, "u2");
        assert_eq!(message.kind, MessageKind::Chat);
        assert_eq!(message.timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn message_accepts_iso_timestamps_and_defaults_kind() {
        let message: ChatMessage = serde_json::from_value(json!({
            "text": "Noor joined",
            "timestamp": "2024-05-01T10:15:00.000Z",
        }))
        .unwrap();

        assert_eq!(message.kind, MessageKind::Chat);
        assert!(message.user_id.is_empty());
        assert_eq!(message.timestamp.to_rfc3339(), "2024-05-01T10:15:00+00:00");
    }

    #[test]
    fn message_without_timestamp_uses_arrival_time() {
        let before = Utc::now();
        let message: ChatMessage = serde_json::from_value(json!({
            "userId": "u2",
            "username": "Noor",
            "text": "hi",
        }))
        .unwrap();

        assert_eq!(message.text, "hi");
        assert!(message.timestamp >= before);
        assert!(message.timestamp <= Utc::now());
    }

    #[test]
    fn system_messages_are_tagged() {
        let message: ChatMessage = serde_json::from_value(json!({
            "text": "Partner left",
            "timestamp": 0,
            "type": "system",
        }))
        .unwrap();

        assert_eq!(message.kind, MessageKind::System);
    }
}
