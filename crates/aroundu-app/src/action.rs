//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use aroundu_proto::UserId;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Open the connection to the server.
    Connect,

    /// Register a device location.
    RegisterLocation {
        /// Raw latitude.
        lat: f64,
        /// Raw longitude.
        lon: f64,
        /// Discovery radius in meters.
        radius: u32,
    },

    /// The location source failed.
    LocationUnavailable {
        /// Reason from the location source.
        reason: String,
    },

    /// Submit the profile form.
    UpdateProfile {
        /// Display name.
        username: String,
        /// Self-declared gender.
        gender: String,
        /// Matching preference.
        interest: String,
    },

    /// Ask to be matched with someone nearby.
    StartMatching,

    /// Fetch a fresh nearby-users list.
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

    /// Send a chat message.
    SendMessage {
        /// Message text.
        text: String,
    },

    /// The chat input changed.
    InputChanged,

    /// Leave the current room.
    LeaveRoom,

    /// Tear the session down locally.
    Disconnect,
}
