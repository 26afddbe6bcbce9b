//! Terminal UI for AroundU
//!
//! A thin shell over [`aroundu_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`aroundu_app::Runtime`].
//!
//! This crate handles rendering, line editing and slash commands.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
pub mod input;
pub mod system_env;
pub mod terminal;
pub mod ui;

pub use aroundu_app::{App, AppAction, AppEvent, Bridge, Driver, KeyInput, Runtime};
pub use commands::Command;
pub use input::InputState;
pub use system_env::SystemEnv;
pub use terminal::{TerminalDriver, TerminalError};
