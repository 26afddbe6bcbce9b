//! Client events, actions and notices.

use aroundu_proto::{ClientCommand, Packet, ServerEvent, UserId};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving packets from the transport and reporting when it closes
/// - Driving time forward via ticks
/// - Forwarding user intents (register, request a chat, send a message, ...)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (virtual instant) environments.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Start connecting to the server.
    Connect,

    /// Packet received from the transport.
    PacketReceived(Packet),

    /// Already-decoded server event.
    ///
    /// Skips the framing layer. Used by in-memory drivers.
    Server(ServerEvent),

    /// The transport closed or failed to open.
    ChannelClosed {
        /// Why it closed.
        reason: String,
    },

    /// Time tick for timer processing.
    ///
    /// The caller should send ticks periodically so that reconnection,
    /// liveness, auto-match, typing and error timers can fire.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// The device produced a location reading.
    RegisterLocation {
        /// Raw latitude.
        lat: f64,
        /// Raw longitude.
        lon: f64,
        /// Discovery radius in meters.
        radius: u32,
    },

    /// The device could not produce a location reading.
    LocationUnavailable {
        /// Reason reported by the location source.
        reason: String,
    },

    /// User submitted the profile form.
    UpdateProfile {
        /// Display name, trimmed before sending.
        username: String,
        /// Self-declared gender.
        gender: String,
        /// Matching preference.
        interest: String,
    },

    /// User asked to be matched.
    StartMatching,

    /// Request a fresh nearby-users snapshot.
    RefreshNearby,

    /// Invite a nearby user.
    RequestChat {
        /// User to invite.
        target: UserId,
    },

    /// Answer the pending incoming request.
    RespondChat {
        /// Whether to accept.
        accept: bool,
    },

    /// Send a chat message to the room.
    SendMessage {
        /// Raw text. Sent untrimmed; whitespace-only text is ignored.
        text: String,
    },

    /// The chat input changed.
    InputChanged,

    /// Leave the current room.
    LeaveRoom,

    /// Local teardown. No reconnection follows.
    Disconnect,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Emit an application event.
    Send(ClientCommand),

    /// Write a framing-level packet (namespace connect, pong).
    SendPacket(Packet),

    /// Open a transport to the server.
    OpenChannel,

    /// Close the current transport.
    CloseChannel,

    /// Show something to the user.
    Notify(Notice),
}

/// Reject notice text.
pub const REJECTED_NOTICE: &str = "User rejected your chat request or is busy.";

/// User-facing notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Our chat request was declined or the target was busy.
    Rejected {
        /// User that declined.
        from_id: UserId,
    },

    /// The partner ended the chat.
    ChatEnded {
        /// Explanation.
        text: &'static str,
    },

    /// Transient error reported by the server.
    ServerError {
        /// Server message.
        message: String,
    },

    /// The connection dropped; a reconnection is scheduled.
    ConnectionLost {
        /// Why it dropped.
        reason: String,
    },

    /// Reconnection gave up.
    ConnectionFailed {
        /// Final error.
        reason: String,
    },
}

impl Notice {
    /// Text to show.
    pub fn text(&self) -> String {
        match self {
            Self::Rejected { .. } => REJECTED_NOTICE.to_string(),
            Self::ChatEnded { text } => (*text).to_string(),
            Self::ServerError { message } => message.clone(),
            Self::ConnectionLost { .. } => "Disconnected from server.".to_string(),
            Self::ConnectionFailed { reason } => format!("Unable to reach the server: {reason}"),
        }
    }
}
