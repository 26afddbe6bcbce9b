//! Error types for the AroundU client core.
//!
//! Strongly-typed errors per layer: channel errors (lifecycle transitions,
//! exhausted reconnection), registration errors and location validation.
//! Protocol errors live in `aroundu-proto` and are converted at the boundary.

use thiserror::Error;

use crate::{channel::ChannelState, session::Stage};

/// Errors raised by the channel state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Invalid state transition attempted
    #[error("invalid channel transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ChannelState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Reconnection bound exceeded
    #[error("gave up after {attempts} reconnection attempts")]
    RetriesExhausted {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Underlying transport error
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChannelError {
    /// Returns true if retrying may succeed.
    ///
    /// Only transport failures are transient. An exhausted retry budget or an
    /// invalid transition is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<aroundu_proto::ProtocolError> for ChannelError {
    fn from(err: aroundu_proto::ProtocolError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Location validation failures.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LocationError {
    /// Latitude or longitude is NaN or infinite
    #[error("coordinates must be finite numbers")]
    NonFinite,

    /// Latitude outside [-90, 90] or longitude outside [-180, 180]
    #[error("coordinates out of range: lat {lat}, lon {lon}")]
    OutOfRange {
        /// Offending latitude
        lat: f64,
        /// Offending longitude
        lon: f64,
    },

    /// Discovery radius of zero meters
    #[error("radius must be greater than zero")]
    ZeroRadius,
}

/// Registration operations rejected locally. Nothing is transmitted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Operation not allowed at the current stage
    #[error("cannot {operation} while {stage:?}")]
    InvalidStage {
        /// Stage when the operation was attempted
        stage: Stage,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Username empty after trimming
    #[error("username must not be empty")]
    EmptyUsername,

    /// Location reading failed validation
    #[error(transparent)]
    Location(#[from] LocationError),
}
