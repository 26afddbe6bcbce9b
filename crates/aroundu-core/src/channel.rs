//! Channel lifecycle state machine.
//!
//! Owns the persistent server connection: opening, namespace acknowledgement,
//! liveness, and bounded reconnection. Uses the action pattern: methods take
//! time (and jitter) as input and return [`ChannelAction`]s for the driver to
//! execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ connect ┌────────────┐   opened    ┌───────────┐
//! │ Idle │────────>│ Connecting │────────────>│ Connected │
//! └──────┘         └────────────┘             └───────────┘
//!                    │       ↑                      │
//!     connect error  │       │ retry due            │ dropped / ping timeout
//!                    ↓       │                      ↓
//!                 ┌──────────────┐  bound exceeded ┌────────┐
//!                 │ Reconnecting │────────────────>│ Failed │
//!                 └──────────────┘                 └────────┘
//! ```
//!
//! Any state moves to `Closed` on local teardown; a closed channel never
//! reconnects on its own.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{error::ChannelError, timer::Timer};

/// Reconnection attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay before the first reconnection attempt. Doubles per attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound on the reconnection delay.
pub const DEFAULT_RECONNECT_DELAY_MAX: Duration = Duration::from_millis(5000);

/// Jitter applied to each reconnection delay, as a fraction of the delay.
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;

/// Time allowed between opening the transport and the namespace ack.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Transport error shown while a reconnection is pending.
pub const CONNECT_ERROR_NOTICE: &str = "Connection error. Retrying...";

/// Actions returned by the channel state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    /// Open a transport to the server.
    Open,
    /// Close the current transport.
    Close,
    /// The established session is gone. Everything above the channel must
    /// reset; the server does not resume sessions.
    ResetSession {
        /// Why the channel dropped
        reason: String,
    },
    /// Reconnection gave up. Surface to the user; nothing retries further.
    Fatal(ChannelError),
}

/// Channel state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Never connected
    Idle,
    /// Transport opening, waiting for the namespace ack
    Connecting {
        /// Reconnection attempt number (0 for the initial connect)
        attempt: u32,
    },
    /// Namespace acknowledged, events flow
    Connected,
    /// Waiting for the next attempt
    Reconnecting {
        /// Attempt that will run when the retry deadline passes
        attempt: u32,
    },
    /// Reconnection bound exceeded
    Failed,
    /// Closed locally
    Closed,
}

impl ChannelState {
    /// Whether events can be exchanged.
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// Channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Reconnection attempts before moving to [`ChannelState::Failed`]
    pub max_reconnect_attempts: u32,
    /// Base reconnection delay
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay
    pub reconnect_delay_max: Duration,
    /// Jitter factor in `[0, 1]`
    pub randomization_factor: f64,
    /// Namespace ack timeout
    pub connect_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reconnect_delay_max: DEFAULT_RECONNECT_DELAY_MAX,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Reconnection delay for `attempt` (1-based).
///
/// Exponential from [`ChannelConfig::reconnect_delay`], jittered by up to
/// `randomization_factor` of the delay in either direction, capped at
/// [`ChannelConfig::reconnect_delay_max`]. `random` must be in `[0, 1)`.
pub fn backoff(config: &ChannelConfig, attempt: u32, random: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let base = config.reconnect_delay.as_millis() as f64 * f64::from(1u32 << exponent);

    let mut delay = base;
    if config.randomization_factor > 0.0 {
        let deviation = (random * config.randomization_factor * base).floor();
        if ((random * 10.0).floor() as u64) & 1 == 0 {
            delay -= deviation;
        } else {
            delay += deviation;
        }
    }

    let delay = delay.min(config.reconnect_delay_max.as_millis() as f64).max(0.0);
    Duration::from_millis(delay as u64)
}

/// Channel state machine.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Channel<I> {
    state: ChannelState,
    config: ChannelConfig,
    /// Pending reconnection deadline
    retry: Timer<I>,
    /// `ping_interval + ping_timeout` from the Engine.IO handshake
    liveness: Option<Duration>,
    /// Last inbound traffic (or connect start)
    last_activity: Option<I>,
    /// User-facing transport error while reconnecting
    transport_error: Option<String>,
}

impl<I> Channel<I>
where
    I: Copy + Ord + Add<Duration, Output = I> + Sub<Output = Duration>,
{
    /// Create a channel in [`ChannelState::Idle`].
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            state: ChannelState::Idle,
            config,
            retry: Timer::new(Duration::ZERO),
            liveness: None,
            last_activity: None,
            transport_error: None,
        }
    }

    /// Current state
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Whether events can be exchanged.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Configuration
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Transport error to show while reconnecting. `None` once connected.
    pub fn transport_error(&self) -> Option<&str> {
        self.transport_error.as_deref()
    }

    /// Deadline of the pending reconnection attempt. `None` if not waiting.
    pub fn retry_at(&self) -> Option<I> {
        self.retry.deadline()
    }

    /// Liveness window. `None` until the handshake arrives.
    pub fn liveness_window(&self) -> Option<Duration> {
        self.liveness
    }

    /// Start the first connection attempt.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidState` unless idle, failed or closed
    pub fn connect(&mut self, now: I) -> Result<Vec<ChannelAction>, ChannelError> {
        match self.state {
            ChannelState::Idle | ChannelState::Failed | ChannelState::Closed => {
                self.state = ChannelState::Connecting { attempt: 0 };
                self.retry.cancel();
                self.liveness = None;
                self.last_activity = Some(now);
                tracing::debug!("channel connecting");
                Ok(vec![ChannelAction::Open])
            },
            state => Err(ChannelError::InvalidState { state, operation: "connect" }),
        }
    }

    /// Namespace connect acknowledged.
    ///
    /// Clears the transport error and resets the attempt counter.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidState` if no connection attempt is in flight
    pub fn handle_opened(&mut self, now: I) -> Result<(), ChannelError> {
        match self.state {
            ChannelState::Connecting { attempt } => {
                tracing::info!(attempt, "channel connected");
                self.state = ChannelState::Connected;
                self.transport_error = None;
                self.last_activity = Some(now);
                Ok(())
            },
            // Duplicate ack
            ChannelState::Connected => Ok(()),
            state => Err(ChannelError::InvalidState { state, operation: "handle_opened" }),
        }
    }

    /// Engine.IO handshake received. Records the liveness window.
    pub fn handle_handshake(&mut self, ping_interval: Duration, ping_timeout: Duration, now: I) {
        self.liveness = Some(ping_interval + ping_timeout);
        self.last_activity = Some(now);
    }

    /// Inbound traffic of any kind.
    pub fn handle_activity(&mut self, now: I) {
        self.last_activity = Some(now);
    }

    /// The connection attempt failed before the namespace ack.
    ///
    /// `random` is the jitter sample in `[0, 1)`.
    pub fn handle_connect_error(
        &mut self,
        reason: &str,
        random: f64,
        now: I,
    ) -> Vec<ChannelAction> {
        let ChannelState::Connecting { attempt } = self.state else {
            tracing::debug!(state = ?self.state, %reason, "ignoring connect error");
            return vec![];
        };

        tracing::warn!(attempt, %reason, "connection attempt failed");
        self.transport_error = Some(CONNECT_ERROR_NOTICE.to_string());

        let mut actions = vec![ChannelAction::Close];
        actions.extend(self.schedule_retry(attempt, random, now));
        actions
    }

    /// The transport went away.
    ///
    /// From `Connected` this resets the session and schedules a reconnection.
    /// From `Connecting` it counts as a failed attempt.
    pub fn handle_dropped(&mut self, reason: &str, random: f64, now: I) -> Vec<ChannelAction> {
        match self.state {
            ChannelState::Connected => {
                tracing::warn!(%reason, "channel dropped");
                self.liveness = None;
                let mut actions = vec![ChannelAction::ResetSession { reason: reason.to_string() }];
                actions.extend(self.schedule_retry(0, random, now));
                actions
            },
            ChannelState::Connecting { .. } => self.handle_connect_error(reason, random, now),
            state => {
                tracing::debug!(?state, %reason, "ignoring drop");
                vec![]
            },
        }
    }

    /// Periodic maintenance: liveness, connect timeout, due reconnections.
    pub fn tick(&mut self, random: f64, now: I) -> Vec<ChannelAction> {
        match self.state {
            ChannelState::Connected => {
                let (Some(window), Some(last)) = (self.liveness, self.last_activity) else {
                    return vec![];
                };
                if now - last <= window {
                    return vec![];
                }

                let mut actions = vec![ChannelAction::Close];
                actions.extend(self.handle_dropped("ping timeout", random, now));
                actions
            },
            ChannelState::Connecting { .. } => {
                let Some(started) = self.last_activity else {
                    return vec![];
                };
                if now - started <= self.config.connect_timeout {
                    return vec![];
                }
                self.handle_connect_error("connect timeout", random, now)
            },
            ChannelState::Reconnecting { attempt } => {
                if !self.retry.poll(now) {
                    return vec![];
                }
                tracing::debug!(attempt, "reconnecting");
                self.state = ChannelState::Connecting { attempt };
                self.last_activity = Some(now);
                vec![ChannelAction::Open]
            },
            ChannelState::Idle | ChannelState::Failed | ChannelState::Closed => vec![],
        }
    }

    /// Local teardown. No reconnection follows.
    pub fn close(&mut self) {
        self.state = ChannelState::Closed;
        self.retry.cancel();
        self.liveness = None;
        self.transport_error = None;
    }

    fn schedule_retry(&mut self, previous: u32, random: f64, now: I) -> Vec<ChannelAction> {
        let attempt = previous.saturating_add(1);

        if attempt > self.config.max_reconnect_attempts {
            tracing::error!(attempts = previous, "reconnection attempts exhausted");
            self.state = ChannelState::Failed;
            self.retry.cancel();
            return vec![ChannelAction::Fatal(ChannelError::RetriesExhausted {
                attempts: self.config.max_reconnect_attempts,
            })];
        }

        let delay = backoff(&self.config, attempt, random);
        tracing::debug!(attempt, ?delay, "reconnection scheduled");
        self.state = ChannelState::Reconnecting { attempt };
        self.retry.arm_after(now, delay);
        vec![]
    }
}
