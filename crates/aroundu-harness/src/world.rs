//! Multi-client simulation world.
//!
//! `SimWorld` wires several [`App`]/[`Bridge`] pairs to one [`SimServer`]
//! under a shared virtual clock. It performs the same steps as
//! [`aroundu_app::Runtime`] (process actions, flush packets, execute channel
//! operations, drain inbound, tick) but synchronously, so tests control
//! exactly when packets move and time passes.

use std::time::Duration;

use aroundu_app::{App, AppAction, AppEvent, Bridge, ChannelOp, Inbound};
use aroundu_client::{Client, ClientConfig};
use aroundu_core::Environment;

use crate::{
    ClientSnapshot, InvariantRegistry, Operation, SimEnv, SimServer, SystemSnapshot, Violation,
    sim_server::SessionId,
};

/// Latitude all generated locations are offset from.
pub const ORIGIN_LAT: f64 = 52.52;
/// Longitude all generated locations are offset from.
pub const ORIGIN_LON: f64 = 13.405;

/// Virtual time per tick while advancing.
pub const TICK: Duration = Duration::from_millis(100);

/// Bound on settle rounds, so a livelock fails fast instead of hanging.
const MAX_SETTLE_ROUNDS: usize = 256;

/// One simulated front end.
struct SimClient {
    app: App,
    bridge: Bridge<SimEnv>,
    session: Option<SessionId>,
}

impl SimClient {
    /// Run App actions to completion, the way the runtime does.
    fn process_actions(&mut self, server: &mut SimServer, actions: Vec<AppAction>) {
        let mut pending = actions;
        while !pending.is_empty() {
            for action in std::mem::take(&mut pending) {
                match action {
                    AppAction::Render | AppAction::Quit => {},
                    other => {
                        let mut events = self.bridge.process_app_action(other);
                        events.extend(self.flush(server));
                        for event in events {
                            pending.extend(self.app.handle(event));
                        }
                    },
                }
            }
        }
    }

    fn process_events(&mut self, server: &mut SimServer, events: Vec<AppEvent>) {
        let mut events = events;
        events.extend(self.flush(server));
        for event in events {
            let actions = self.app.handle(event);
            self.process_actions(server, actions);
        }
    }

    fn flush(&mut self, server: &mut SimServer) -> Vec<AppEvent> {
        let mut events = Vec::new();
        loop {
            for packet in self.bridge.take_outgoing() {
                if let Some(session) = self.session {
                    server.receive(session, packet);
                }
            }

            let ops = self.bridge.take_channel_ops();
            if ops.is_empty() {
                break;
            }
            for op in ops {
                if let Some(session) = self.session.take() {
                    server.close(session);
                }
                if op == ChannelOp::Open {
                    match server.accept() {
                        Some(session) => self.session = Some(session),
                        None => events.extend(self.bridge.handle_closed("connection refused")),
                    }
                }
            }
        }
        events
    }

    /// Deliver everything waiting at the server. Returns whether anything
    /// arrived.
    fn pump(&mut self, server: &mut SimServer) -> bool {
        let mut delivered = false;
        while let Some(session) = self.session
            && let Some(inbound) = server.poll(session)
        {
            delivered = true;
            let events = match inbound {
                Inbound::Packet(packet) => self.bridge.handle_packet(packet),
                Inbound::Closed { reason } => {
                    self.session = None;
                    server.close(session);
                    self.bridge.handle_closed(reason)
                },
            };
            self.process_events(server, events);
        }
        delivered
    }

    fn tick(&mut self, server: &mut SimServer, now: <SimEnv as Environment>::Instant) {
        let events = self.bridge.handle_tick(now);
        self.process_events(server, events);
    }
}

/// Several clients talking to one simulated server.
pub struct SimWorld {
    env: SimEnv,
    config: ClientConfig,
    server: SimServer,
    clients: Vec<SimClient>,
}

impl SimWorld {
    /// Empty world with default client configuration.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, ClientConfig::default())
    }

    /// Empty world with a specific client configuration.
    pub fn with_config(seed: u64, config: ClientConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        Self { server: SimServer::new(env.clone()), env, config, clients: Vec::new() }
    }

    /// Add a client, connect it and settle. Returns its index.
    pub fn add_client(&mut self) -> usize {
        let mut client = SimClient {
            app: App::new("sim://aroundu".into()),
            bridge: Bridge::new(self.env.clone(), self.config.clone()),
            session: None,
        };
        let actions = client.app.connect();
        client.process_actions(&mut self.server, actions);
        self.clients.push(client);
        self.settle();
        self.clients.len() - 1
    }

    /// Run App actions for a client without delivering responses.
    pub fn act(&mut self, index: usize, actions: Vec<AppAction>) {
        if let Some(client) = self.clients.get_mut(index) {
            client.process_actions(&mut self.server, actions);
        }
    }

    /// Run App actions for a client and settle.
    pub fn perform(&mut self, index: usize, actions: Vec<AppAction>) {
        self.act(index, actions);
        self.settle();
    }

    /// Deliver packets until nothing is in flight, tick every client at the
    /// current time, then deliver whatever the tick produced.
    pub fn settle(&mut self) {
        self.server.tick();
        self.drain();
        let now = self.env.now();
        for client in &mut self.clients {
            client.tick(&mut self.server, now);
        }
        self.drain();
    }

    fn drain(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let mut delivered = false;
            for client in &mut self.clients {
                delivered |= client.pump(&mut self.server);
            }
            if !delivered {
                return;
            }
        }
        tracing::warn!(rounds = MAX_SETTLE_ROUNDS, "world did not settle");
    }

    /// Let `duration` pass in [`TICK`] steps, settling after each.
    pub fn advance(&mut self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() {
            let step = remaining.min(TICK);
            self.env.advance(step);
            remaining -= step;
            self.settle();
        }
    }

    /// Apply one generated operation. Indexes wrap around the client count.
    pub fn apply(&mut self, op: Operation) {
        let Some(index) = self.resolve(op.client()) else {
            match op {
                Operation::SetReachable(reachable) => self.server.set_reachable(reachable),
                Operation::Advance { millis } => {
                    self.advance(Duration::from_millis(u64::from(millis)));
                },
                Operation::Settle => self.settle(),
                _ => {},
            }
            return;
        };

        let app = &self.clients[index].app;
        let actions = match op {
            Operation::Register { lat_offset, lon_offset, .. } => app.register_location(
                ORIGIN_LAT + f64::from(lat_offset) * 0.001,
                ORIGIN_LON + f64::from(lon_offset) * 0.001,
            ),
            Operation::LocationUnavailable { .. } => app.location_unavailable("denied"),
            Operation::Profile { blank, .. } => {
                let name = if blank { String::from("  ") } else { format!("user{index}") };
                app.update_profile(&name, "other", "any")
            },
            Operation::StartMatching { .. } => app.start_matching(),
            Operation::RefreshNearby { .. } => app.refresh_nearby(),
            Operation::RequestChat { target, .. } => {
                let target = usize::from(target) % self.clients.len();
                match self.clients[target].app.view().identity.id.clone() {
                    Some(id) => app.request_chat(id),
                    None => return,
                }
            },
            Operation::Respond { accept, .. } => app.respond(accept),
            Operation::SendMessage { len, .. } => {
                let text: String = std::iter::repeat_n('x', usize::from(len)).collect();
                app.send_message(if text.is_empty() { String::from(" ") } else { text })
            },
            Operation::Type { .. } => app.input_changed(),
            Operation::Leave { .. } => app.leave_room(),
            Operation::DropConnection { .. } => {
                self.drop_connection(index);
                return;
            },
            Operation::Kick { .. } => {
                self.kick(index);
                return;
            },
            Operation::SetReachable(_) | Operation::Advance { .. } | Operation::Settle => return,
        };
        self.act(index, actions);
    }

    fn resolve(&self, client: Option<u8>) -> Option<usize> {
        let client = usize::from(client?);
        (!self.clients.is_empty()).then(|| client % self.clients.len())
    }

    /// Drop a client's transport as a network failure would.
    pub fn drop_connection(&mut self, index: usize) {
        if let Some(session) = self.clients.get(index).and_then(|c| c.session) {
            self.server.drop_session(session, "transport close");
        }
    }

    /// End a client's session from the server side.
    pub fn kick(&mut self, index: usize) {
        if let Some(session) = self.clients.get(index).and_then(|c| c.session) {
            self.server.kick(session);
        }
    }

    /// Number of clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether there are no clients.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// App of a client.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn app(&self, index: usize) -> &App {
        &self.clients[index].app
    }

    /// Protocol client behind an App.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn client(&self, index: usize) -> &Client<SimEnv> {
        self.clients[index].bridge.client()
    }

    /// Server session currently used by a client.
    pub fn session(&self, index: usize) -> Option<SessionId> {
        self.clients.get(index).and_then(|c| c.session)
    }

    /// The simulated server.
    pub fn server(&self) -> &SimServer {
        &self.server
    }

    /// Mutable access to the simulated server.
    pub fn server_mut(&mut self) -> &mut SimServer {
        &mut self.server
    }

    /// Shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Observable state of every client and the server's rooms.
    pub fn snapshot(&self) -> SystemSnapshot {
        let clients = self
            .clients
            .iter()
            .enumerate()
            .map(|(index, client)| {
                ClientSnapshot::from_client(index, client.bridge.client())
                    .with_screen(client.app.screen())
            })
            .collect();
        SystemSnapshot::from_clients(clients).with_server_rooms(self.server.rooms())
    }

    /// Check a registry against the current state.
    ///
    /// # Errors
    ///
    /// Returns every violated invariant.
    pub fn check(&self, registry: &InvariantRegistry) -> Result<(), Vec<Violation>> {
        registry.check_all(&self.snapshot())
    }
}
