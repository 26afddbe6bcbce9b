//! Deterministic simulation harness for the AroundU client.
//!
//! Virtual-clock implementations of the Environment and Driver traits plus an
//! in-memory server, for deterministic, reproducible testing of the whole
//! client stack: protocol reducer, bridge, App and runtime.
//!
//! # Simulation
//!
//! - [`SimEnv`]: seeded RNG and a clock that only moves when told to
//! - [`SimServer`]: in-memory broker speaking the real wire format
//! - [`SimDriver`]: runs the production [`aroundu_app::Runtime`] against the
//!   server
//! - [`SimWorld`]: several clients stepped synchronously, driven by
//!   [`Operation`]s
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for checks that
//! hold at every step and [`InvariantRegistry::quiescent()`] once nothing is
//! in flight.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod operation;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_server;
pub mod world;

pub use invariants::{
    ClientSnapshot, Invariant, InvariantRegistry, InvariantResult, SystemSnapshot, Violation,
};
pub use operation::{ClientIndex, Operation};
pub use sim_driver::{SharedSimServer, SimDriver, SimDriverError, create_shared_server};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_server::{SessionId, SimServer};
pub use world::SimWorld;
