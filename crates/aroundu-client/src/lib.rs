//! Client
//!
//! Action-based client state machine for the AroundU protocol. Owns the
//! connection lifecycle, registration, presence, chat negotiation and the
//! active room for one session.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`aroundu_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`]) for
//! the caller to execute.
//!
//! # Components
//!
//! - [`Client`]: the event reducer
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//! - [`ClientView`]: Read-only snapshot for front ends
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedClient`]: Packet channels over a WebSocket
//! - [`transport::connect`]: Connect to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod view;

#[cfg(feature = "transport")]
pub mod transport;

pub use aroundu_core::{Environment, Stage};
pub use client::{Client, ClientConfig};
pub use error::{ClientError, LOCATION_UNAVAILABLE_NOTICE};
pub use event::{ClientAction, ClientEvent, Notice, REJECTED_NOTICE};
pub use view::ClientView;
