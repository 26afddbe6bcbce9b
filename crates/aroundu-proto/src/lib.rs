//! AroundU wire protocol
//!
//! The server speaks Socket.IO over a WebSocket. This crate owns both layers of
//! that contract:
//!
//! - [`Packet`]: Engine.IO / Socket.IO text framing (handshake, keepalive,
//!   namespace connect, events)
//! - [`ClientCommand`] / [`ServerEvent`]: the closed set of application events
//!   and their JSON payloads
//!
//! Everything here is pure data plus encode/decode. No I/O, no state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod packet;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use packet::{ENGINE_IO_VERSION, Handshake, Packet, SOCKET_IO_PATH, SocketPacket, websocket_url};
pub use payloads::{ClientCommand, ErrorPayload, ServerEvent};

/// Server-assigned session id.
pub type UserId = String;

/// Server-assigned room id.
pub type RoomId = String;
