//! Registration payloads: location, profile and the server's view of the
//! session.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// The server's record of this session.
///
/// Sent with `session_config` right after connecting (only `id` is
/// guaranteed) and again with `profile_updated` once the profile is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Server-assigned id.
    pub id: UserId,
    /// Registered latitude (already rounded by the client).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Registered longitude (already rounded by the client).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Discovery radius in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<u32>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Self-declared gender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Gender the user wants to be matched with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
    /// Avatar glyph assigned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl SessionUser {
    /// Bare session record carrying only the id.
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            lat: None,
            lon: None,
            radius: None,
            username: None,
            gender: None,
            interest: None,
            avatar: None,
        }
    }

    /// Whether the server has a location on record for this session.
    pub fn has_location(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// `{user}` wrapper used by `session_config` and `profile_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEnvelope {
    /// Session record.
    pub user: SessionUser,
}

/// `register_location` payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRegistration {
    /// Latitude, rounded to 3 decimal places.
    pub lat: f64,
    /// Longitude, rounded to 3 decimal places.
    pub lon: f64,
    /// Discovery radius in meters.
    pub radius: u32,
}

/// `update_profile` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// Display name (trimmed, non-empty).
    pub username: String,
    /// Self-declared gender.
    pub gender: String,
    /// Gender the user wants to be matched with.
    pub interest: String,
}
