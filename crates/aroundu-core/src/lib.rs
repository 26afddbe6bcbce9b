//! Core state machines for the AroundU client.
//!
//! Every unit here is Sans-IO: it takes the current time (and jitter, where
//! needed) as input and returns values describing what should happen. The
//! `aroundu-client` crate composes them into a single event reducer.
//!
//! # Components
//!
//! - [`channel::Channel`]: connection lifecycle, liveness and bounded
//!   reconnection
//! - [`session::Session`]: identity and registration progression
//! - [`presence::PresenceCache`]: latest nearby-users snapshot
//! - [`negotiation::Negotiation`]: chat request slots
//! - [`room::ActiveRoom`] and [`room::TypingDebounce`]: in-room state
//! - [`timer::Timer`]: cancellable deadlines shared by all of the above
//! - [`env::Environment`]: time and randomness, swappable for simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
pub mod env;
pub mod error;
pub mod location;
pub mod negotiation;
pub mod presence;
pub mod room;
pub mod session;
pub mod timer;

pub use channel::{Channel, ChannelAction, ChannelConfig, ChannelState};
pub use env::Environment;
pub use error::{ChannelError, LocationError, SessionError};
pub use session::{SessionConfig, Stage};
