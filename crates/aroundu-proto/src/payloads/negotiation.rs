//! Chat request negotiation payloads.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Descriptor of the user behind an incoming request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPeer {
    /// Requester id. Used as `targetUserId` when responding.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub username: String,
    /// Avatar glyph.
    #[serde(default)]
    pub avatar: String,
    /// Distance in meters, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// `incoming_request` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Who is asking.
    pub from: RequestPeer,
}

/// `request_chat` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTarget {
    /// User to invite.
    pub target_user_id: UserId,
}

/// `respond_chat` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Requester being answered.
    pub target_user_id: UserId,
    /// Whether the invitation is accepted.
    pub accept: bool,
}

/// `chat_rejected` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRejected {
    /// User that declined, or was busy or unreachable.
    pub from_id: UserId,
}

/// `chat_ended` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEnded {
    /// Why the chat ended (`partner_left`, `partner_disconnected`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The partner closed the chat explicitly.
    #[serde(default)]
    pub auto_close: bool,
}

impl ChatEnded {
    /// Reason sent when the partner left the room.
    pub const PARTNER_LEFT: &'static str = "partner_left";
    /// Reason sent when the partner's connection dropped.
    pub const PARTNER_DISCONNECTED: &'static str = "partner_disconnected";

    /// User-facing explanation.
    pub fn notice_text(&self) -> &'static str {
        if self.auto_close {
            "Partner ended the chat."
        } else if self.reason.as_deref() == Some(Self::PARTNER_LEFT) {
            "Chat ended: Partner left the chat."
        } else {
            "Chat ended: Partner disconnected."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_ended_wording() {
        let closed = ChatEnded { reason: Some("partner_left".into()), auto_close: true };
        assert_eq!(closed.notice_text(), "Partner ended the chat.");

        let left = ChatEnded { reason: Some("partner_left".into()), auto_close: false };
        assert_eq!(left.notice_text(), "Chat ended: Partner left the chat.");

        let dropped = ChatEnded { reason: None, auto_close: false };
        assert_eq!(dropped.notice_text(), "Chat ended: Partner disconnected.");
    }
}
