//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: Protocol bridge to Client
//! - [`Driver`]: Platform-specific I/O

use aroundu_client::ClientConfig;
use aroundu_core::Environment;

use crate::{App, AppAction, AppEvent, Bridge, ChannelOp, Driver, Inbound};

/// Upper bound on inbound packets handled per cycle, so input stays
/// responsive under a burst.
const MAX_INBOUND_PER_CYCLE: usize = 64;

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time and reconnection jitter
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
    server_addr: String,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a new runtime with the given driver and environment.
    pub fn new(driver: D, env: E, config: ClientConfig, server_addr: String) -> Self {
        let app = App::new(server_addr.clone());
        let bridge = Bridge::new(env, config);
        Self { driver, app, bridge, server_addr }
    }

    /// Run the main event loop.
    ///
    /// This is the core orchestration loop that:
    /// 1. Polls for input events from the driver
    /// 2. Receives packets from the server
    /// 3. Ticks the client timers
    /// 4. Sends outgoing packets and executes channel operations
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        let actions = self.app.connect();
        let mut quit = self.process_actions(actions).await?;
        while !quit {
            quit = self.process_cycle().await?;
        }

        let _ = self.bridge.process_app_action(AppAction::Disconnect);
        self.flush_bridge().await;
        self.driver.stop();
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let actions = self.driver.poll_event(&mut self.app).await?;
        if !actions.is_empty() && self.process_actions(actions).await? {
            return Ok(true);
        }

        for _ in 0..MAX_INBOUND_PER_CYCLE {
            if !self.driver.is_connected() {
                break;
            }
            let Some(inbound) = self.driver.recv_packet().await else {
                break;
            };
            let events = match inbound {
                Inbound::Packet(packet) => self.bridge.handle_packet(packet),
                Inbound::Closed { reason } => {
                    self.driver.disconnect();
                    self.bridge.handle_closed(reason)
                },
            };
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        let now = self.driver.now();
        let events = self.bridge.handle_tick(now);
        self.process_bridge_events(events).await
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),

                    // Everything else is a client operation
                    other => {
                        let mut events = self.bridge.process_app_action(other);
                        events.extend(self.flush_bridge().await);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                }
            }
        }
        Ok(false)
    }

    /// Process events from Bridge back to App.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        let mut events = events;
        events.extend(self.flush_bridge().await);

        for event in events {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Send pending packets and execute channel operations.
    ///
    /// Transport failures are fed back into the client as a closed channel
    /// so it can schedule a reconnection. Returns the resulting App events.
    async fn flush_bridge(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();

        loop {
            for packet in self.bridge.take_outgoing() {
                if let Err(e) = self.driver.send_packet(packet).await {
                    tracing::warn!(error = %e, "send failed, dropping connection");
                    self.driver.disconnect();
                    events.extend(self.bridge.handle_closed(e.to_string()));
                    break;
                }
            }

            let ops = self.bridge.take_channel_ops();
            if ops.is_empty() {
                break;
            }
            for op in ops {
                match op {
                    ChannelOp::Open => {
                        self.driver.disconnect();
                        if let Err(e) = self.driver.connect(&self.server_addr).await {
                            tracing::warn!(server = %self.server_addr, error = %e, "connect failed");
                            events.extend(self.bridge.handle_closed(e.to_string()));
                        }
                    },
                    ChannelOp::Close => self.driver.disconnect(),
                }
            }
        }

        events
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// Get a reference to the Bridge
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }
}
