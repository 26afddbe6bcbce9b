//! The session rules themselves.
//!
//! All but [`RoomMembershipAgreement`] look at one client at a time and
//! report the first client that breaks them.

use aroundu_client::Stage;

use super::{ClientSnapshot, Invariant, InvariantResult, SystemSnapshot, Violation};

fn violation(invariant: &'static str, client: &ClientSnapshot, message: String) -> Violation {
    Violation::new(invariant, format!("client {}: {message}", client.index))
}

/// A disconnected client holds no session state.
///
/// Losing the channel resets to `Anonymous` and clears room, presence,
/// message log and negotiation. Nothing survives a connection loss.
pub struct DisconnectResets;

impl Invariant for DisconnectResets {
    fn name(&self) -> &'static str {
        "disconnect_resets"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in state.clients.iter().filter(|c| !c.connected) {
            let leftovers = [
                (client.stage != Stage::Anonymous, "stage"),
                (client.room.is_some(), "room"),
                (client.message_count > 0, "messages"),
                (client.nearby.is_some(), "nearby list"),
                (client.incoming.is_some(), "incoming request"),
                (client.outgoing.is_some(), "outgoing request"),
                (client.auto_match_armed == Some(true), "auto-match timer"),
                (client.typing_armed == Some(true), "typing timer"),
            ];
            if let Some((_, what)) = leftovers.iter().find(|(held, _)| *held) {
                return Err(violation(
                    self.name(),
                    client,
                    format!("disconnected but still holds {what} ({client:?})"),
                ));
            }
        }
        Ok(())
    }
}

/// Stage is `InRoom` exactly when a room is held, and the nearby list is
/// hidden while in a room.
pub struct RoomStageAgreement;

impl Invariant for RoomStageAgreement {
    fn name(&self) -> &'static str {
        "room_stage_agreement"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let in_room_stage = client.stage == Stage::InRoom;
            if client.room.is_some() != in_room_stage {
                return Err(violation(
                    self.name(),
                    client,
                    format!("stage {:?} with room {:?}", client.stage, client.room),
                ));
            }
            if client.room.is_some() && client.nearby.is_some() {
                return Err(violation(self.name(), client, "nearby list visible in room".into()));
            }
        }
        Ok(())
    }
}

/// Message log, roster and typing slot only exist inside a room.
pub struct MessageLogScopedToRoom;

impl Invariant for MessageLogScopedToRoom {
    fn name(&self) -> &'static str {
        "message_log_scoped_to_room"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in state.clients.iter().filter(|c| c.room.is_none()) {
            if client.message_count > 0 || client.roster_len > 0 || client.typing_shown {
                return Err(violation(
                    self.name(),
                    client,
                    format!(
                        "outside a room with {} messages, {} roster entries, typing {}",
                        client.message_count, client.roster_len, client.typing_shown
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Entering a room settles every negotiation.
pub struct NoNegotiationInRoom;

impl Invariant for NoNegotiationInRoom {
    fn name(&self) -> &'static str {
        "no_negotiation_in_room"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in state.clients.iter().filter(|c| c.room.is_some()) {
            if client.incoming.is_some() || client.outgoing.is_some() {
                return Err(violation(
                    self.name(),
                    client,
                    format!("in room with incoming {:?} outgoing {:?}", client.incoming, client.outgoing),
                ));
            }
        }
        Ok(())
    }
}

/// Timers are only armed in the state that owns them.
///
/// The typing-idle timer needs a room; the auto-match timer needs no room.
/// Skipped for snapshots without timer state.
pub struct TimersFollowState;

impl Invariant for TimersFollowState {
    fn name(&self) -> &'static str {
        "timers_follow_state"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if client.typing_armed == Some(true) && client.room.is_none() {
                return Err(violation(self.name(), client, "typing timer armed outside a room".into()));
            }
            if client.auto_match_armed == Some(true) && client.room.is_some() {
                return Err(violation(self.name(), client, "auto-match armed inside a room".into()));
            }
        }
        Ok(())
    }
}

/// Clients agree with the server about room membership.
///
/// Only meaningful once every packet in flight has been delivered. Skipped
/// when the snapshot carries no server state.
pub struct RoomMembershipAgreement;

impl Invariant for RoomMembershipAgreement {
    fn name(&self) -> &'static str {
        "room_membership_agreement"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(rooms) = &state.server_rooms else {
            return Ok(());
        };

        for client in &state.clients {
            let (Some(room), Some(user)) = (&client.room, &client.user_id) else {
                continue;
            };
            let listed = rooms.get(room).is_some_and(|members| members.contains(user));
            if !listed {
                return Err(violation(
                    self.name(),
                    client,
                    format!("believes it is in {room} but the server lists {:?}", rooms.get(room)),
                ));
            }
        }

        for (room, members) in rooms {
            for member in members {
                let agrees = state
                    .clients
                    .iter()
                    .filter(|c| c.user_id.as_ref() == Some(member))
                    .all(|c| c.room.as_ref() == Some(room));
                if !agrees {
                    return Err(Violation::new(
                        self.name(),
                        format!("server has {member} in {room}, the client disagrees"),
                    ));
                }
            }
        }
        Ok(())
    }
}
