//! Active room: message log, roster, remote typing slot, and the local typing
//! debounce.
//!
//! An [`ActiveRoom`] exists only while the session is in a room. Dropping it
//! is how the log, roster and typing slot are cleared on every room
//! transition.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use aroundu_proto::{
    UserId,
    payloads::room::{ChatMessage, Room, RoomUser, TypingUpdate},
};

use crate::timer::Timer;

/// Idle time after the last keystroke before `typing=false` is sent.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_millis(3000);

/// State of the room the session is in.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRoom {
    room: Room,
    messages: Vec<ChatMessage>,
    roster: Vec<RoomUser>,
    typing: Option<UserId>,
}

impl ActiveRoom {
    /// Entered `room`. Log, roster and typing slot start empty.
    pub fn new(room: Room) -> Self {
        Self { room, messages: Vec::new(), roster: Vec::new(), typing: None }
    }

    /// Room descriptor
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Room id
    pub fn id(&self) -> &str {
        &self.room.id
    }

    /// Messages in arrival order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Current roster
    pub fn roster(&self) -> &[RoomUser] {
        &self.roster
    }

    /// Participant currently typing, if any.
    pub fn typing(&self) -> Option<&UserId> {
        self.typing.as_ref()
    }

    /// Append a message. Arrival order is kept; nothing is re-sorted.
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replace the roster wholesale.
    pub fn replace_roster(&mut self, users: Vec<RoomUser>) {
        self.roster = users;
    }

    /// Apply a remote typing update.
    ///
    /// The slot holds one user. `is_typing: false` clears it no matter who
    /// sent it.
    pub fn apply_typing(&mut self, update: TypingUpdate) {
        self.typing = if update.is_typing { Some(update.user_id) } else { None };
    }
}

/// Local typing indicator debounce.
///
/// Emits `typing=true` once per burst of input and `typing=false` once when
/// the burst ends, either by going idle or by sending the message.
#[derive(Debug, Clone)]
pub struct TypingDebounce<I> {
    typing: bool,
    idle: Timer<I>,
}

impl<I> TypingDebounce<I>
where
    I: Copy + Ord + Add<Duration, Output = I> + Sub<Output = Duration>,
{
    /// Create an idle debounce with the given idle timeout.
    pub fn new(idle_timeout: Duration) -> Self {
        Self { typing: false, idle: Timer::new(idle_timeout) }
    }

    /// Whether we told the room we are typing.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Pending idle deadline.
    pub fn idle_deadline(&self) -> Option<I> {
        self.idle.deadline()
    }

    /// Local input changed. Returns `Some(true)` on the first keystroke of a
    /// burst. Always restarts the idle timer.
    pub fn input_changed(&mut self, now: I) -> Option<bool> {
        let started = !self.typing;
        self.typing = true;
        self.idle.arm(now);
        started.then_some(true)
    }

    /// Check the idle timer. Returns `Some(false)` once when it elapses.
    pub fn poll(&mut self, now: I) -> Option<bool> {
        if !self.idle.poll(now) {
            return None;
        }
        self.typing = false;
        Some(false)
    }

    /// The message was sent. Always returns `Some(false)`, whether or not a
    /// burst was in progress.
    pub fn message_sent(&mut self) -> Option<bool> {
        self.idle.cancel();
        self.typing = false;
        Some(false)
    }

    /// Leave or disconnect. Clears without emitting anything.
    pub fn cancel(&mut self) {
        self.idle.cancel();
        self.typing = false;
    }
}
