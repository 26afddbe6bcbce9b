//! Chat request negotiation.
//!
//! One outgoing slot (who we invited) and one incoming slot (who invited us).
//! A newer request in either direction replaces the older one; requests are
//! never queued.

use aroundu_proto::{
    UserId,
    payloads::negotiation::{ChatRequest, ChatResponse, RequestPeer},
};

/// Negotiation slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Negotiation {
    outgoing: Option<UserId>,
    incoming: Option<RequestPeer>,
}

impl Negotiation {
    /// Both slots empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invited user. `None` if no invitation is outstanding.
    pub fn outgoing(&self) -> Option<&UserId> {
        self.outgoing.as_ref()
    }

    /// Pending invitation from someone else.
    pub fn incoming(&self) -> Option<&RequestPeer> {
        self.incoming.as_ref()
    }

    /// Whether either slot is filled.
    pub fn is_pending(&self) -> bool {
        self.outgoing.is_some() || self.incoming.is_some()
    }

    /// Record an outgoing invitation. Returns the invitation it replaced.
    pub fn request(&mut self, target: UserId) -> Option<UserId> {
        self.outgoing.replace(target)
    }

    /// Record an incoming invitation. Returns the invitation it replaced.
    pub fn receive(&mut self, request: ChatRequest) -> Option<RequestPeer> {
        let replaced = self.incoming.replace(request.from);
        if let Some(previous) = &replaced {
            tracing::debug!(previous = %previous.id, "incoming request replaced");
        }
        replaced
    }

    /// Answer the incoming invitation.
    ///
    /// Declining clears the slot right away. Accepting keeps it until the
    /// server places us in a room. `None` if nothing is pending.
    pub fn respond(&mut self, accept: bool) -> Option<ChatResponse> {
        let target_user_id = self.incoming.as_ref()?.id.clone();
        if !accept {
            self.incoming = None;
        }
        Some(ChatResponse { target_user_id, accept })
    }

    /// Our invitation was declined (or the target was busy).
    ///
    /// Returns whether the rejection matched the outstanding invitation.
    pub fn rejected(&mut self, from_id: &str) -> bool {
        let matched = self.outgoing.as_deref() == Some(from_id);
        if !matched {
            tracing::debug!(%from_id, outgoing = ?self.outgoing, "rejection for another request");
        }
        self.outgoing = None;
        matched
    }

    /// Clear both slots.
    pub fn clear(&mut self) {
        self.outgoing = None;
        self.incoming = None;
    }
}
