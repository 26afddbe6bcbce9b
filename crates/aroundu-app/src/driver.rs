//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use aroundu_proto::Packet;

use crate::{App, AppAction};

/// Something that arrived from the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A decoded packet.
    Packet(Packet),
    /// The transport closed.
    Closed {
        /// Why it closed.
        reason: String,
    },
}

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in production TUI and simulation.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, WebSocket transport
/// - **Simulation**: in-memory server with a virtual clock
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Poll user input and translate it into App actions.
    ///
    /// May wait briefly for input. Returns an empty list when nothing
    /// happened.
    fn poll_event(
        &mut self,
        app: &mut App,
    ) -> impl Future<Output = Result<Vec<AppAction>, Self::Error>> + Send;

    /// Send a packet to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or send fails.
    fn send_packet(&mut self, packet: Packet)
    -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Take the next pending inbound item.
    ///
    /// Returns `None` when nothing is pending. Does not wait.
    fn recv_packet(&mut self) -> impl Future<Output = Option<Inbound>> + Send;

    /// Establish connection to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if connection cannot be established.
    fn connect(&mut self, addr: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Drop the current connection, if any.
    fn disconnect(&mut self);

    /// Check if a transport is open.
    fn is_connected(&self) -> bool;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Stop the connection and clean up resources.
    fn stop(&mut self);
}
