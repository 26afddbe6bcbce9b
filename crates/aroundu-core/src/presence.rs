//! Presence cache.
//!
//! Holds the latest `nearby_users` snapshot. Snapshots replace each other
//! wholesale. A snapshot that arrives while the session is in a room is kept
//! but hidden until the session is back in the lobby.

use aroundu_proto::{UserId, payloads::presence::NearbyUser};

/// Latest presence snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceCache {
    snapshot: Option<Vec<NearbyUser>>,
}

impl PresenceCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot.
    pub fn replace(&mut self, users: Vec<NearbyUser>) {
        tracing::debug!(count = users.len(), "presence snapshot replaced");
        self.snapshot = Some(users);
    }

    /// Snapshot to show. `None` while in a room or before the first snapshot.
    pub fn visible(&self, in_room: bool) -> Option<&[NearbyUser]> {
        if in_room { None } else { self.snapshot.as_deref() }
    }

    /// Stored snapshot regardless of room state.
    pub fn held(&self) -> Option<&[NearbyUser]> {
        self.snapshot.as_deref()
    }

    /// Look up a user in the stored snapshot.
    pub fn find(&self, id: &str) -> Option<&NearbyUser> {
        self.snapshot.as_ref()?.iter().find(|user| user.id == id)
    }

    /// Ids in the stored snapshot.
    pub fn ids(&self) -> impl Iterator<Item = &UserId> {
        self.snapshot.iter().flatten().map(|user| &user.id)
    }

    /// Drop the snapshot.
    pub fn clear(&mut self) {
        self.snapshot = None;
    }
}
