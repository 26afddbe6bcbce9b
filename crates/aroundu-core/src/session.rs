//! Session identity and registration progression.
//!
//! The user-visible [`Stage`] is never stored. It is derived from the
//! registration progress, the lobby activity, the negotiation slots and the
//! room, so it cannot disagree with any of them.
//!
//! ```text
//! Anonymous ──> LocationSent ──> ProfileComplete ──> Browsing ──> Matching
//!                                                       ↑            │
//!                                leave / rejected /     │            ↓
//!                                chat ended             │     RequestPending
//!                                                       │            │
//!                                                       └── InRoom <─┘
//! ```
//!
//! A dropped connection returns to `Anonymous` from anywhere.

use std::time::Duration;

use aroundu_proto::{
    RoomId, UserId,
    payloads::session::{LocationRegistration, ProfileUpdate, SessionUser},
};
use serde::{Deserialize, Serialize};

use crate::{error::SessionError, location};

/// Delay between registration and the automatic `start_matching`.
pub const DEFAULT_AUTO_MATCH_DELAY: Duration = Duration::from_millis(1500);

/// How long a server error stays visible.
pub const DEFAULT_ERROR_NOTICE_TTL: Duration = Duration::from_millis(3000);

/// Session behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Start matching automatically after registration and after leaving a
    /// room.
    pub auto_match: bool,
    /// Delay before the automatic `start_matching`
    pub auto_match_delay: Duration,
    /// Lifetime of a transient server error
    pub error_notice_ttl: Duration,
    /// Idle time before the local typing indicator is cleared
    pub typing_idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_match: true,
            auto_match_delay: DEFAULT_AUTO_MATCH_DELAY,
            error_notice_ttl: DEFAULT_ERROR_NOTICE_TTL,
            typing_idle_timeout: crate::room::TYPING_IDLE_TIMEOUT,
        }
    }
}

/// Registration progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Registration {
    /// Nothing sent yet
    #[default]
    Anonymous,
    /// `register_location` sent
    LocationSent {
        /// The server has answered since
        confirmed: bool,
    },
    /// `profile_updated` received
    Registered,
}

/// What a registered session is doing in the lobby.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activity {
    /// Registered, nothing requested yet
    #[default]
    ProfileComplete,
    /// Presence requested
    Browsing,
    /// `start_matching` sent
    Matching,
}

/// User-visible session stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Connected, nothing registered
    Anonymous,
    /// Location sent, profile outstanding
    LocationSent,
    /// Profile stored by the server
    ProfileComplete,
    /// Looking at nearby users
    Browsing,
    /// Waiting for the server to pair us
    Matching,
    /// A chat request is outstanding in either direction
    RequestPending,
    /// In a room
    InRoom,
}

impl Stage {
    /// Derive the stage from its parts. A room wins over everything, then a
    /// pending negotiation, then the lobby activity.
    pub fn derive(
        registration: Registration,
        activity: Activity,
        negotiation_pending: bool,
        in_room: bool,
    ) -> Self {
        if in_room {
            return Self::InRoom;
        }
        match registration {
            Registration::Anonymous => Self::Anonymous,
            Registration::LocationSent { .. } => Self::LocationSent,
            Registration::Registered if negotiation_pending => Self::RequestPending,
            Registration::Registered => match activity {
                Activity::ProfileComplete => Self::ProfileComplete,
                Activity::Browsing => Self::Browsing,
                Activity::Matching => Self::Matching,
            },
        }
    }

    /// Registration finished.
    pub fn is_registered(self) -> bool {
        !matches!(self, Self::Anonymous | Self::LocationSent)
    }
}

/// What the session knows about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    /// Server-assigned id
    pub id: Option<UserId>,
    /// Transmitted (rounded) location
    pub location: Option<LocationRegistration>,
    /// Display name
    pub username: Option<String>,
    /// Self-declared gender
    pub gender: Option<String>,
    /// Matching preference
    pub interest: Option<String>,
    /// Avatar glyph
    pub avatar: Option<String>,
}

impl Identity {
    /// Merge the server's record. Fields the server omits are kept.
    pub fn apply(&mut self, user: &SessionUser) {
        self.id = Some(user.id.clone());
        if let (Some(lat), Some(lon)) = (user.lat, user.lon) {
            let radius = user
                .radius
                .or(self.location.map(|loc| loc.radius))
                .unwrap_or(location::DEFAULT_RADIUS);
            self.location = Some(LocationRegistration { lat, lon, radius });
        }
        if user.username.is_some() {
            self.username.clone_from(&user.username);
        }
        if user.gender.is_some() {
            self.gender.clone_from(&user.gender);
        }
        if user.interest.is_some() {
            self.interest.clone_from(&user.interest);
        }
        if user.avatar.is_some() {
            self.avatar.clone_from(&user.avatar);
        }
    }

    /// Whether a location has been registered.
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }
}

/// A local change applied before the server confirmed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Optimistic {
    /// Left a room; the server has not caught up yet
    LeftRoom {
        /// Room that was left
        room_id: RoomId,
    },
    /// Declined an incoming request
    Declined {
        /// Requester that was declined
        user_id: UserId,
    },
    /// Sent a location, not yet confirmed
    LocationSent,
}

/// Registration state and identity of one connection.
///
/// Discarded wholesale when the connection drops; nothing here survives a
/// reconnect.
#[derive(Debug, Clone, Default)]
pub struct Session {
    identity: Identity,
    registration: Registration,
    activity: Activity,
    optimistic: Vec<Optimistic>,
}

impl Session {
    /// Fresh anonymous session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity as known so far
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Registration progress
    pub fn registration(&self) -> Registration {
        self.registration
    }

    /// Lobby activity
    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Whether `profile_updated` has been received.
    pub fn is_registered(&self) -> bool {
        self.registration == Registration::Registered
    }

    /// Derive the current stage.
    pub fn stage(&self, negotiation_pending: bool, in_room: bool) -> Stage {
        Stage::derive(self.registration, self.activity, negotiation_pending, in_room)
    }

    /// Unreconciled local changes, oldest first.
    pub fn optimistic(&self) -> &[Optimistic] {
        &self.optimistic
    }

    /// Validate and record a location registration.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidStage` unless anonymous
    /// - `SessionError::Location` for an invalid reading
    pub fn register_location(
        &mut self,
        lat: f64,
        lon: f64,
        radius: u32,
    ) -> Result<LocationRegistration, SessionError> {
        if self.registration != Registration::Anonymous {
            return Err(SessionError::InvalidStage {
                stage: self.stage(false, false),
                operation: "register_location",
            });
        }

        let registration = location::registration(lat, lon, radius)?;
        self.identity.location = Some(registration);
        self.registration = Registration::LocationSent { confirmed: false };
        self.record(Optimistic::LocationSent);
        tracing::debug!(lat = registration.lat, lon = registration.lon, radius, "location sent");
        Ok(registration)
    }

    /// Validate a profile update. The stage only moves once the server
    /// answers with `profile_updated`.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidStage` unless a location was sent
    /// - `SessionError::EmptyUsername` if the trimmed username is empty
    pub fn update_profile(
        &self,
        username: &str,
        gender: &str,
        interest: &str,
    ) -> Result<ProfileUpdate, SessionError> {
        if !matches!(self.registration, Registration::LocationSent { .. }) {
            return Err(SessionError::InvalidStage {
                stage: self.stage(false, false),
                operation: "update_profile",
            });
        }

        let username = username.trim();
        if username.is_empty() {
            return Err(SessionError::EmptyUsername);
        }

        Ok(ProfileUpdate {
            username: username.to_string(),
            gender: gender.to_string(),
            interest: interest.to_string(),
        })
    }

    /// Check that matching may start and record the intent.
    ///
    /// Repeated calls are allowed; each one is transmitted.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidStage` before registration completes
    pub fn start_matching(&mut self) -> Result<(), SessionError> {
        if !self.is_registered() {
            return Err(SessionError::InvalidStage {
                stage: self.stage(false, false),
                operation: "start_matching",
            });
        }
        self.activity = Activity::Matching;
        Ok(())
    }

    /// Back to browsing the lobby: after a refresh from `ProfileComplete`,
    /// a rejection, or leaving a room. Matching intent is dropped.
    pub fn browse(&mut self) {
        if self.is_registered() {
            self.activity = Activity::Browsing;
        }
    }

    /// Presence was requested. Only moves a freshly registered session.
    pub fn refreshed(&mut self) {
        if self.is_registered() && self.activity == Activity::ProfileComplete {
            self.activity = Activity::Browsing;
        }
    }

    /// `session_config` arrived.
    pub fn apply_session_config(&mut self, user: &SessionUser) {
        self.identity.apply(user);
        if let Registration::LocationSent { confirmed: false } = self.registration {
            self.registration = Registration::LocationSent { confirmed: true };
            self.settle(&Optimistic::LocationSent);
        }
    }

    /// `profile_updated` arrived. Returns whether this completed
    /// registration.
    pub fn apply_profile_updated(&mut self, user: &SessionUser) -> bool {
        self.identity.apply(user);
        self.settle(&Optimistic::LocationSent);
        if self.registration == Registration::Registered {
            return false;
        }

        tracing::debug!(id = %user.id, "registration complete");
        self.registration = Registration::Registered;
        self.activity = Activity::ProfileComplete;
        true
    }

    /// Record a local change awaiting reconciliation.
    ///
    /// At most one change of each kind is kept; a newer one replaces the
    /// older.
    pub fn record(&mut self, change: Optimistic) {
        let kind = std::mem::discriminant(&change);
        self.optimistic.retain(|entry| std::mem::discriminant(entry) != kind);
        self.optimistic.push(change);
    }

    /// Drop a reconciled change. Returns whether it was recorded.
    pub fn settle(&mut self, change: &Optimistic) -> bool {
        let before = self.optimistic.len();
        self.optimistic.retain(|entry| entry != change);
        before != self.optimistic.len()
    }

    /// Drop every recorded room departure. Returns whether any was pending.
    pub fn settle_departures(&mut self) -> bool {
        let before = self.optimistic.len();
        self.optimistic.retain(|entry| !matches!(entry, Optimistic::LeftRoom { .. }));
        before != self.optimistic.len()
    }

    /// Whether a room departure is still unreconciled.
    pub fn has_departure(&self) -> bool {
        self.optimistic.iter().any(|entry| matches!(entry, Optimistic::LeftRoom { .. }))
    }
}
