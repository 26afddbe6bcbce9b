//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding packets and payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet text was empty.
    #[error("empty packet")]
    EmptyPacket,

    /// Engine.IO packet type is not recognized.
    #[error("unknown packet type {0:?}")]
    UnknownPacketType(char),

    /// Socket.IO packet type is valid but not supported by this client
    /// (acknowledgements and binary events).
    #[error("unsupported socket packet type {0:?}")]
    UnsupportedPacket(char),

    /// Packet structure is invalid.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(String),

    /// Event payload does not match the shape expected for the event.
    #[error("unexpected payload for {event}: {reason}")]
    UnexpectedPayload {
        /// Event name.
        event: String,
        /// Why the payload was rejected.
        reason: String,
    },

    /// Event name is not part of the protocol.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
