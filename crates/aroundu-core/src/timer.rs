//! Cancellable one-shot timers.
//!
//! A [`Timer`] is a deadline value, not a task. The owning state machine arms
//! it with the current time and polls it from its tick handler. Cancelling is
//! just clearing the deadline, so a cancelled timer can never fire late.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// One-shot timer with a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer<I> {
    duration: Duration,
    deadline: Option<I>,
}

impl<I> Timer<I>
where
    I: Copy + Ord + Add<Duration, Output = I> + Sub<Output = Duration>,
{
    /// Create a disarmed timer.
    pub fn new(duration: Duration) -> Self {
        Self { duration, deadline: None }
    }

    /// Configured duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// (Re)arm the timer to fire `duration` after `now`.
    ///
    /// Re-arming an armed timer replaces the previous deadline.
    pub fn arm(&mut self, now: I) {
        self.deadline = Some(now + self.duration);
    }

    /// Arm the timer for an explicit delay instead of the configured duration.
    pub fn arm_after(&mut self, now: I, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Disarm the timer. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline. `None` if disarmed.
    pub fn deadline(&self) -> Option<I> {
        self.deadline
    }

    /// Time left until the deadline. `None` if disarmed.
    pub fn remaining(&self, now: I) -> Option<Duration> {
        self.deadline.map(|deadline| if deadline > now { deadline - now } else { Duration::ZERO })
    }

    /// Fire the timer if its deadline has passed.
    ///
    /// Returns `true` exactly once per arming.
    pub fn poll(&mut self, now: I) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            },
            _ => false,
        }
    }
}
