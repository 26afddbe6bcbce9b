//! Application input events.
//!
//! This module defines [`AppEvent`], the set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two distinct sources:
//! - User interactions (Keyboard, Resize) and system ticks.
//! - Protocol notifications translated from the underlying client.

use aroundu_client::{ClientView, Notice};

use crate::KeyInput;

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Connection in progress.
    Connecting,

    /// Client state changed.
    Updated(Box<ClientView>),

    /// Something to show the user.
    Notice(Notice),

    /// A local operation was refused.
    Error {
        /// Error description.
        message: String,
    },
}
