//! Operations for randomized simulation.
//!
//! Operations represent everything users and the network can do to a
//! [`crate::SimWorld`]. They are generated by proptest or by the fuzzer and
//! applied in order; invalid operations for the current state are expected
//! and must be tolerated.

use arbitrary::Arbitrary;

/// Client index (taken modulo the number of clients).
pub type ClientIndex = u8;

/// Operations that can be applied to a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Register a location near the common origin.
    Register {
        /// Client performing the operation.
        client: ClientIndex,
        /// Latitude offset in thousandths of a degree (about 111 meters).
        lat_offset: i8,
        /// Longitude offset in thousandths of a degree.
        lon_offset: i8,
    },

    /// The location source failed.
    LocationUnavailable {
        /// Client whose location source failed.
        client: ClientIndex,
    },

    /// Submit the profile form.
    Profile {
        /// Client submitting.
        client: ClientIndex,
        /// Leave the username blank.
        blank: bool,
    },

    /// Ask to be matched.
    StartMatching {
        /// Client asking.
        client: ClientIndex,
    },

    /// Fetch a fresh nearby list.
    RefreshNearby {
        /// Client asking.
        client: ClientIndex,
    },

    /// Invite another client.
    RequestChat {
        /// Client inviting.
        client: ClientIndex,
        /// Client invited.
        target: ClientIndex,
    },

    /// Answer a pending request.
    Respond {
        /// Client answering.
        client: ClientIndex,
        /// Accept or decline.
        accept: bool,
    },

    /// Send a chat message.
    SendMessage {
        /// Sender.
        client: ClientIndex,
        /// Message length in characters. Zero sends whitespace only.
        len: u8,
    },

    /// Type into the chat input.
    Type {
        /// Typing client.
        client: ClientIndex,
    },

    /// Leave the current room.
    Leave {
        /// Leaving client.
        client: ClientIndex,
    },

    /// The network drops a client's connection.
    DropConnection {
        /// Affected client.
        client: ClientIndex,
    },

    /// The server ends a client's session.
    Kick {
        /// Affected client.
        client: ClientIndex,
    },

    /// Make new connections succeed or fail.
    SetReachable(bool),

    /// Let virtual time pass.
    Advance {
        /// Milliseconds to advance.
        millis: u16,
    },

    /// Deliver everything in flight.
    Settle,
}

impl Operation {
    /// Client this operation targets, if any.
    pub fn client(&self) -> Option<ClientIndex> {
        match *self {
            Self::Register { client, .. }
            | Self::LocationUnavailable { client }
            | Self::Profile { client, .. }
            | Self::StartMatching { client }
            | Self::RefreshNearby { client }
            | Self::RequestChat { client, .. }
            | Self::Respond { client, .. }
            | Self::SendMessage { client, .. }
            | Self::Type { client }
            | Self::Leave { client }
            | Self::DropConnection { client }
            | Self::Kick { client } => Some(client),
            Self::SetReachable(_) | Self::Advance { .. } | Self::Settle => None,
        }
    }
}
