//! Engine.IO / Socket.IO packet codec.
//!
//! The server speaks Socket.IO v5 on top of Engine.IO v4 over a WebSocket.
//! Every WebSocket text message is one Engine.IO packet: a single type digit
//! followed by an optional body. Engine.IO `message` packets carry a Socket.IO
//! packet, which again starts with a type digit.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2 / 3                                                    ping / pong
//! 40                                                       namespace connect
//! 40{"sid":".."}                                           connect ack
//! 42["event",payload]                                      event
//! 44{"message":".."}                                       connect error
//! ```
//!
//! Only the subset the client needs is supported. Acknowledgements and binary
//! attachments are rejected with [`ProtocolError::UnsupportedPacket`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Engine.IO protocol revision spoken by the client.
pub const ENGINE_IO_VERSION: u8 = 4;

/// Path of the Socket.IO endpoint on the server.
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Build the WebSocket URL for a server base URL.
///
/// Accepts `http(s)://` and `ws(s)://` bases and rewrites them to the
/// WebSocket scheme.
pub fn websocket_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        format!("ws://{base}")
    };
    format!("{base}{SOCKET_IO_PATH}?EIO={ENGINE_IO_VERSION}&transport=websocket")
}

/// Engine.IO open handshake sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id (not the application user id).
    pub sid: String,
    /// Transport upgrades offered by the server.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping interval in milliseconds.
    pub ping_interval: u64,
    /// Time the server waits for a pong, in milliseconds.
    pub ping_timeout: u64,
    /// Maximum payload size accepted by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// Server ping interval.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval)
    }

    /// Server pong timeout.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout)
    }
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Session opened.
    Open(Handshake),
    /// Transport closed by the peer.
    Close,
    /// Keepalive ping. The receiver answers with [`Packet::Pong`].
    Ping,
    /// Keepalive answer.
    Pong,
    /// Socket.IO packet.
    Message(SocketPacket),
    /// No-op (used during transport upgrades).
    Noop,
}

/// Socket.IO packet carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect. Sent bare by the client, echoed with a sid by the
    /// server.
    Connect {
        /// Socket.IO socket id. `None` on the client request.
        sid: Option<String>,
    },
    /// Namespace disconnect.
    Disconnect,
    /// Application event.
    Event {
        /// Event name.
        name: String,
        /// First event argument. `None` for argument-less events.
        data: Option<Value>,
    },
    /// Namespace connection refused.
    ConnectError {
        /// Reason reported by the server.
        message: String,
    },
}

#[derive(Deserialize)]
struct ConnectAck {
    sid: String,
}

#[derive(Deserialize)]
struct ConnectErrorBody {
    message: String,
}

impl Packet {
    /// Client request to join the default namespace.
    pub fn connect() -> Self {
        Self::Message(SocketPacket::Connect { sid: None })
    }

    /// Event packet.
    pub fn event(name: impl Into<String>, data: Option<Value>) -> Self {
        Self::Message(SocketPacket::Event { name: name.into(), data })
    }

    /// Encode to WebSocket text.
    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            Self::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Message(packet) => format!("4{}", packet.encode()?),
            Self::Noop => "6".to_string(),
        })
    }

    /// Decode WebSocket text.
    pub fn decode(text: &str) -> Result<Self> {
        let kind = text.chars().next().ok_or(ProtocolError::EmptyPacket)?;
        let body = &text[kind.len_utf8()..];

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(body)?)),
            '1' => Ok(Self::Close),
            // Ping payloads only appear during transport upgrades.
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Ok(Self::Message(SocketPacket::decode(body)?)),
            '6' => Ok(Self::Noop),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }
}

impl SocketPacket {
    fn encode(&self) -> Result<String> {
        Ok(match self {
            Self::Connect { sid: None } => "0".to_string(),
            Self::Connect { sid: Some(sid) } => {
                format!("0{}", serde_json::json!({ "sid": sid }))
            },
            Self::Disconnect => "1".to_string(),
            Self::Event { name, data } => {
                let mut items = vec![Value::String(name.clone())];
                items.extend(data.iter().cloned());
                format!("2{}", serde_json::to_string(&items)?)
            },
            Self::ConnectError { message } => {
                format!("4{}", serde_json::json!({ "message": message }))
            },
        })
    }

    fn decode(text: &str) -> Result<Self> {
        let kind = *text.as_bytes().first().ok_or(ProtocolError::EmptyPacket)?;
        if !kind.is_ascii_digit() {
            return Err(ProtocolError::MalformedPacket(format!(
                "socket packet type must be a digit: {text:?}"
            )));
        }

        let mut body = &text[1..];

        // Optional "/namespace," prefix
        if body.starts_with('/') {
            body = body.split_once(',').map_or("", |(_, tail)| tail);
        }

        // Optional acknowledgement id
        let body = body.trim_start_matches(|c: char| c.is_ascii_digit());

        match kind {
            b'0' if body.is_empty() => Ok(Self::Connect { sid: None }),
            b'0' => {
                let ack: ConnectAck = serde_json::from_str(body)?;
                Ok(Self::Connect { sid: Some(ack.sid) })
            },
            b'1' => Ok(Self::Disconnect),
            b'2' => decode_event(body),
            b'4' => {
                let message = serde_json::from_str::<ConnectErrorBody>(body)
                    .map_or_else(|_| body.to_string(), |err| err.message);
                Ok(Self::ConnectError { message })
            },
            other => Err(ProtocolError::UnsupportedPacket(char::from(other))),
        }
    }
}

fn decode_event(body: &str) -> Result<SocketPacket> {
    let items: Vec<Value> = serde_json::from_str(body)?;
    let mut items = items.into_iter();

    let name = match items.next() {
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(ProtocolError::MalformedPacket(format!(
                "event name must be a string, got {other}"
            )));
        },
        None => return Err(ProtocolError::MalformedPacket("empty event array".to_string())),
    };

    Ok(SocketPacket::Event { name, data: items.next() })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_server_handshake() {
        let text = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        let packet = Packet::decode(text).unwrap();

        let Packet::Open(handshake) = packet else {
            panic!("expected open packet, got {packet:?}");
        };
        assert_eq!(handshake.sid, "abc");
        assert_eq!(handshake.ping_interval(), Duration::from_secs(25));
        assert_eq!(handshake.ping_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn decodes_connect_ack_with_sid() {
        let packet = Packet::decode(r#"40{"sid":"xyz"}"#).unwrap();
        assert_eq!(packet, Packet::Message(SocketPacket::Connect { sid: Some("xyz".into()) }));
    }

    #[test]
    fn decodes_event_with_namespace_and_ack_id() {
        let packet = Packet::decode(r#"42/chat,17["receive_message",{"text":"hi"}]"#).unwrap();
        assert_eq!(packet, Packet::event("receive_message", Some(json!({ "text": "hi" }))));
    }

    #[test]
    fn decodes_argumentless_event() {
        let packet = Packet::decode(r#"42["start_matching"]"#).unwrap();
        assert_eq!(packet, Packet::event("start_matching", None));
    }

    #[test]
    fn decodes_connect_error_message() {
        let packet = Packet::decode(r#"44{"message":"Not authorized"}"#).unwrap();
        assert_eq!(
            packet,
            Packet::Message(SocketPacket::ConnectError { message: "Not authorized".into() })
        );
    }

    #[test]
    fn ping_with_upgrade_payload_is_ping() {
        assert_eq!(Packet::decode("2probe").unwrap(), Packet::Ping);
    }

    #[test]
    fn encodes_client_connect_and_events() {
        assert_eq!(Packet::connect().encode().unwrap(), "40");
        assert_eq!(
            Packet::event("typing", Some(json!(true))).encode().unwrap(),
            r#"42["typing",true]"#
        );
        assert_eq!(Packet::event("leave_room", None).encode().unwrap(), r#"42["leave_room"]"#);
        assert_eq!(Packet::Pong.encode().unwrap(), "3");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Packet::decode(""), Err(ProtocolError::EmptyPacket));
        assert_eq!(Packet::decode("9"), Err(ProtocolError::UnknownPacketType('9')));
        assert!(matches!(Packet::decode("42[]"), Err(ProtocolError::MalformedPacket(_))));
        assert!(matches!(Packet::decode("42[1,2]"), Err(ProtocolError::MalformedPacket(_))));
        assert!(matches!(Packet::decode("4x"), Err(ProtocolError::MalformedPacket(_))));
        assert_eq!(Packet::decode("43[]"), Err(ProtocolError::UnsupportedPacket('3')));
        assert!(matches!(Packet::decode("42not json"), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn websocket_url_rewrites_scheme() {
        assert_eq!(
            websocket_url("http://localhost:5004"),
            "ws://localhost:5004/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            websocket_url("https://chat.example.com/"),
            "wss://chat.example.com/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            websocket_url("10.0.0.2:5004"),
            "ws://10.0.0.2:5004/socket.io/?EIO=4&transport=websocket"
        );
    }
}
