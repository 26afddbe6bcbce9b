//! Presence snapshot payloads.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// A discoverable user within the session's radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyUser {
    /// Server-assigned id.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub username: String,
    /// Avatar glyph.
    #[serde(default)]
    pub avatar: String,
    /// Distance from this session in meters.
    pub distance: f64,
}

impl NearbyUser {
    /// Human readable distance: meters below one kilometer, otherwise
    /// kilometers with one decimal.
    pub fn distance_label(&self) -> String {
        if self.distance < 1000.0 {
            format!("{}m", self.distance.round() as u64)
        } else {
            format!("{:.1}km", self.distance / 1000.0)
        }
    }
}

/// `nearby_users` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyUsers {
    /// Full snapshot. Replaces any previous one.
    pub users: Vec<NearbyUser>,
}
