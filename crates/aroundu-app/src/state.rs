//! Observable application state types.
//!
//! These structures are the "View Model" for the application: the subset of
//! client state a front end needs to decide what to draw.

use aroundu_client::{ClientView, Stage};
use aroundu_core::ChannelState;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to server.
    Disconnected,
    /// Initial connection in progress.
    Connecting,
    /// Connection dropped; retrying.
    Reconnecting {
        /// Attempt number.
        attempt: u32,
    },
    /// Connected and namespace acknowledged.
    Connected,
    /// Gave up reconnecting.
    Failed,
}

impl From<ChannelState> for ConnectionState {
    fn from(state: ChannelState) -> Self {
        match state {
            ChannelState::Idle | ChannelState::Closed => Self::Disconnected,
            ChannelState::Connecting { attempt: 0 } => Self::Connecting,
            ChannelState::Connecting { attempt } | ChannelState::Reconnecting { attempt } => {
                Self::Reconnecting { attempt }
            },
            ChannelState::Connected => Self::Connected,
            ChannelState::Failed => Self::Failed,
        }
    }
}

/// Which screen to show.
///
/// Exactly one screen is visible at a time. The choice is a pure function of
/// the client view, checked in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Not connected yet, or reconnecting.
    Connecting,
    /// A transient error is being shown.
    Error,
    /// In a chat room.
    Chat,
    /// Registered: nearby users, matching and requests.
    Nearby,
    /// Location sent, profile form pending.
    Profile,
    /// Fresh session, asking for the location.
    Location,
}

impl Screen {
    /// Select the screen for a client view.
    pub fn select(view: &ClientView) -> Self {
        if !view.is_connected() {
            return Self::Connecting;
        }
        if view.error().is_some() {
            return Self::Error;
        }
        if view.room.is_some() {
            return Self::Chat;
        }
        match view.stage {
            Stage::Anonymous => Self::Location,
            Stage::LocationSent => Self::Profile,
            Stage::ProfileComplete
            | Stage::Browsing
            | Stage::Matching
            | Stage::RequestPending
            | Stage::InRoom => Self::Nearby,
        }
    }
}
