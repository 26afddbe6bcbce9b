//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`aroundu_app::Runtime`] orchestration code runs in both production and
//! simulation, against an in-memory [`SimServer`] and a virtual clock.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use aroundu_app::{App, AppAction, AppEvent, Driver, Inbound, Screen};
use aroundu_core::Environment;
use aroundu_proto::Packet;

use crate::{
    invariants::{InvariantRegistry, SystemSnapshot},
    sim_env::{SimEnv, SimInstant},
    sim_server::{SessionId, SimServer},
};

/// Virtual time that passes on every input poll.
pub const DEFAULT_STEP: Duration = Duration::from_millis(100);

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Server shared between drivers.
pub type SharedSimServer = Arc<Mutex<SimServer>>;

/// Create a shared server for testing.
pub fn create_shared_server(env: SimEnv) -> SharedSimServer {
    Arc::new(Mutex::new(SimServer::new(env)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared state for injection and inspection.
///
/// This allows injection from outside async contexts.
#[derive(Default)]
struct SharedState {
    pending_events: VecDeque<AppEvent>,
    pending_actions: VecDeque<Vec<AppAction>>,
    session: Option<SessionId>,
    quit_at: Option<SimInstant>,
    screens: Vec<Screen>,
    status: Option<String>,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
///
/// Clones share state, so a test can keep a handle while the runtime owns
/// the driver.
#[derive(Clone)]
pub struct SimDriver {
    env: SimEnv,
    server: SharedSimServer,
    step: Duration,
    state: Arc<Mutex<SharedState>>,
    invariants: Option<Arc<InvariantRegistry>>,
}

impl SimDriver {
    /// Create a driver talking to `server`.
    pub fn new(env: SimEnv, server: SharedSimServer) -> Self {
        Self {
            env,
            server,
            step: DEFAULT_STEP,
            state: Arc::default(),
            invariants: None,
        }
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(registry));
        self
    }

    /// Virtual time per input poll.
    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&self, event: AppEvent) {
        lock(&self.state).pending_events.push_back(event);
    }

    /// Queue a batch of user actions, delivered on one poll.
    pub fn inject_actions(&self, actions: Vec<AppAction>) {
        lock(&self.state).pending_actions.push_back(actions);
    }

    /// Let `duration` of virtual time pass with no input.
    pub fn inject_idle(&self, duration: Duration) {
        let polls = duration.as_millis().div_ceil(self.step.as_millis().max(1));
        let mut state = lock(&self.state);
        for _ in 0..polls {
            state.pending_actions.push_back(Vec::new());
        }
    }

    /// Quit once the virtual clock reaches `deadline` and all input is
    /// consumed.
    pub fn quit_at(&self, deadline: SimInstant) {
        lock(&self.state).quit_at = Some(deadline);
    }

    /// Server session used by this driver.
    pub fn session(&self) -> Option<SessionId> {
        lock(&self.state).session
    }

    /// Screens in render order.
    pub fn screens(&self) -> Vec<Screen> {
        lock(&self.state).screens.clone()
    }

    /// Status line at the last render.
    pub fn status(&self) -> Option<String> {
        lock(&self.state).status.clone()
    }

    /// Whether the runtime stopped the driver.
    pub fn is_stopped(&self) -> bool {
        lock(&self.state).stopped
    }

    /// Check if there are pending events to process.
    pub fn has_pending(&self) -> bool {
        let state = lock(&self.state);
        !state.pending_events.is_empty() || !state.pending_actions.is_empty()
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(&mut self, app: &mut App) -> Result<Vec<AppAction>, Self::Error> {
        self.env.advance(self.step);
        lock(&self.server).tick();
        let mut state = lock(&self.state);

        if let Some(event) = state.pending_events.pop_front() {
            drop(state);
            return Ok(app.handle(event));
        }
        if let Some(actions) = state.pending_actions.pop_front() {
            return Ok(actions);
        }
        match state.quit_at {
            Some(deadline) if self.env.now() >= deadline => Ok(vec![AppAction::Quit]),
            Some(_) => Ok(vec![]),
            None => Ok(vec![AppAction::Quit]),
        }
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), Self::Error> {
        let session = lock(&self.state).session;
        if let Some(session) = session {
            lock(&self.server).receive(session, packet);
        }
        Ok(())
    }

    async fn recv_packet(&mut self) -> Option<Inbound> {
        let session = lock(&self.state).session?;
        lock(&self.server).poll(session)
    }

    async fn connect(&mut self, _addr: &str) -> Result<(), Self::Error> {
        let session = lock(&self.server)
            .accept()
            .ok_or_else(|| SimDriverError("connection refused".into()))?;
        lock(&self.state).session = Some(session);
        Ok(())
    }

    fn disconnect(&mut self) {
        let session = lock(&self.state).session.take();
        if let Some(session) = session {
            lock(&self.server).close(session);
        }
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).session.is_some()
    }

    fn now(&self) -> SimInstant {
        self.env.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        {
            let mut state = lock(&self.state);
            state.screens.push(app.screen());
            state.status = app.status_message().map(String::from);
        }

        if let Some(registry) = &self.invariants
            && let Err(violations) = registry.check_all(&SystemSnapshot::from_app(app))
        {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            return Err(SimDriverError(messages.join("; ")));
        }
        Ok(())
    }

    fn stop(&mut self) {
        lock(&self.state).stopped = true;
    }
}
