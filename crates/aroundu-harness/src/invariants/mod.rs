//! Session invariants checked while a simulated world runs.
//!
//! Each check reads a [`SystemSnapshot`]: the [`ClientSnapshot`] of every
//! connected app plus, when the simulated server is known, its room table.
//! Two registries cover the two moments a world is inspected:
//!
//! - [`InvariantRegistry::standard`] after every step. Room scoping, stage
//!   derivation, disconnect resets and timer ownership hold even while
//!   events are still in flight.
//! - [`InvariantRegistry::quiescent`] once the world has settled, adding
//!   [`RoomMembershipAgreement`] between the server's rooms and each
//!   client's view.
//!
//! ```ignore
//! world.settle();
//! InvariantRegistry::quiescent().assert_all(&world.snapshot(), "after settling");
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    DisconnectResets, MessageLogScopedToRoom, NoNegotiationInRoom, RoomMembershipAgreement,
    RoomStageAgreement, TimersFollowState,
};
pub use snapshot::{ClientSnapshot, SystemSnapshot};

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A broken session rule, named after the check that caught it.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Check that failed.
    pub invariant: &'static str,
    /// Which client and what it held.
    pub message: String,
}

impl Violation {
    /// Violation reported by `invariant`.
    pub fn new(invariant: &'static str, message: impl Into<String>) -> Self {
        Self { invariant, message: message.into() }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A rule over the session state of every simulated client.
pub trait Invariant: Send + Sync {
    /// Name shown in violations.
    fn name(&self) -> &'static str;

    /// Inspect the snapshot. The first offending client is reported.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// The set of rules a world is checked against.
#[derive(Default)]
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// No rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules that hold after every step.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(DisconnectResets);
        registry.add(RoomStageAgreement);
        registry.add(MessageLogScopedToRoom);
        registry.add(NoNegotiationInRoom);
        registry.add(TimersFollowState);
        registry
    }

    /// [`Self::standard`] plus server/client room agreement, which only holds
    /// once no `room_joined` or `leave_room` is in flight.
    pub fn quiescent() -> Self {
        let mut registry = Self::standard();
        registry.add(RoomMembershipAgreement);
        registry
    }

    /// Register one more rule.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Run every rule and collect all violations.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Fail the current test with every violation, tagged with `context`.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("session invariants broken {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Names of the registered rules, in check order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.invariants.iter().map(|inv| inv.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiescent_extends_standard() {
        let standard: Vec<_> = InvariantRegistry::standard().names().collect();
        let quiescent: Vec<_> = InvariantRegistry::quiescent().names().collect();

        assert_eq!(standard.len(), 5);
        assert_eq!(quiescent[..standard.len()], standard[..]);
        assert_eq!(quiescent.last(), Some(&RoomMembershipAgreement.name()));
    }

    #[test]
    fn world_without_clients_passes() {
        let registry = InvariantRegistry::quiescent();
        assert!(registry.check_all(&SystemSnapshot::empty()).is_ok());
    }

    #[test]
    fn violations_name_their_check() {
        let violation = Violation::new("RoomStageAgreement", "client 0: InRoom without a room");
        assert_eq!(violation.to_string(), "RoomStageAgreement: client 0: InRoom without a room");
    }
}
