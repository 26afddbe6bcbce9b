//! Client errors.
//!
//! Local validation and state errors are never transmitted; the caller
//! surfaces them to the user. Lower-layer errors convert in via `From`.

use aroundu_core::{ChannelError, LocationError, SessionError, Stage};
use aroundu_proto::ProtocolError;
use thiserror::Error;

/// Message shown when the device cannot provide a location.
pub const LOCATION_UNAVAILABLE_NOTICE: &str = "Please enable location access to find nearby users.";

/// Errors returned by [`crate::Client::handle`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Username empty after trimming
    #[error("username must not be empty")]
    EmptyUsername,

    /// Location reading failed validation
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(#[from] LocationError),

    /// The device could not provide a location
    #[error("{}", LOCATION_UNAVAILABLE_NOTICE)]
    LocationUnavailable {
        /// Reason reported by the location source
        reason: String,
    },

    /// Operation not allowed at the current stage
    #[error("cannot {operation} while {stage:?}")]
    InvalidState {
        /// Stage when the operation was attempted
        stage: Stage,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// The channel is not connected
    #[error("cannot {operation}: not connected")]
    NotConnected {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Channel lifecycle error
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Undecodable inbound packet or payload
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Returns true if the same operation may succeed later without user
    /// correction.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotConnected { .. } => true,
            Self::Channel(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidStage { stage, operation } => Self::InvalidState { stage, operation },
            SessionError::EmptyUsername => Self::EmptyUsername,
            SessionError::Location(err) => Self::InvalidCoordinates(err),
        }
    }
}
