//! Protocol-to-Application translation layer.
//!
//! The [`Bridge`] wraps the Sans-IO [`aroundu_client::Client`] and adapts it
//! to the application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction`] into client events.
//! - Accumulates outgoing [`Packet`]s and channel operations for the driver
//!   to execute in the next I/O cycle.
//! - Publishes a fresh [`ClientView`] whenever client state changes, followed
//!   by any notices the client raised.
//! - Manages time ticks generically to support both real-time execution and
//!   deterministic simulation.

use aroundu_client::{Client, ClientAction, ClientConfig, ClientError, ClientEvent, ClientView};
use aroundu_core::Environment;
use aroundu_proto::{Packet, ServerEvent};

use crate::{AppAction, AppEvent};

/// Transport operation requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOp {
    /// Open a connection to the server.
    Open,
    /// Close the current connection.
    Close,
}

/// Bridge between App and Client protocol logic.
///
/// Generic over Environment to support both production and simulation.
/// The Instant type is determined by the Environment's associated type.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    outgoing: Vec<Packet>,
    channel_ops: Vec<ChannelOp>,
    /// Last view published to the App.
    published: Option<ClientView>,
}

impl<E: Environment> Bridge<E> {
    /// Create a new Bridge with the given environment and configuration.
    pub fn new(env: E, config: ClientConfig) -> Self {
        Self {
            client: Client::new(env, config),
            outgoing: Vec::new(),
            channel_ops: Vec::new(),
            published: None,
        }
    }

    /// Underlying client.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        let event = match action {
            AppAction::Render | AppAction::Quit => return vec![],
            AppAction::Connect => ClientEvent::Connect,
            AppAction::RegisterLocation { lat, lon, radius } => {
                ClientEvent::RegisterLocation { lat, lon, radius }
            },
            AppAction::LocationUnavailable { reason } => ClientEvent::LocationUnavailable { reason },
            AppAction::UpdateProfile { username, gender, interest } => {
                ClientEvent::UpdateProfile { username, gender, interest }
            },
            AppAction::StartMatching => ClientEvent::StartMatching,
            AppAction::RefreshNearby => ClientEvent::RefreshNearby,
            AppAction::RequestChat { target } => ClientEvent::RequestChat { target },
            AppAction::RespondChat { accept } => ClientEvent::RespondChat { accept },
            AppAction::SendMessage { text } => ClientEvent::SendMessage { text },
            AppAction::InputChanged => ClientEvent::InputChanged,
            AppAction::LeaveRoom => ClientEvent::LeaveRoom,
            AppAction::Disconnect => ClientEvent::Disconnect,
        };
        self.dispatch(event)
    }

    /// Handle a packet from the server.
    pub fn handle_packet(&mut self, packet: Packet) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::PacketReceived(packet))
    }

    /// Handle an already-decoded server event.
    pub fn handle_server_event(&mut self, event: ServerEvent) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Server(event))
    }

    /// Handle the transport closing or failing to open.
    pub fn handle_closed(&mut self, reason: impl Into<String>) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::ChannelClosed { reason: reason.into() })
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: E::Instant) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Tick { now })
    }

    /// Take pending outgoing packets.
    pub fn take_outgoing(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take pending channel operations, in the order they were requested.
    pub fn take_channel_ops(&mut self) -> Vec<ChannelOp> {
        std::mem::take(&mut self.channel_ops)
    }

    fn dispatch(&mut self, event: ClientEvent<E::Instant>) -> Vec<AppEvent> {
        let result = self.client.handle(event);
        self.handle_client_result(result)
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        let notices = match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(ClientError::Protocol(e)) => {
                tracing::warn!(error = %e, "dropping undecodable server event");
                vec![]
            },
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        };

        let mut events = Vec::with_capacity(notices.len() + 1);
        if let Some(view) = self.changed_view() {
            events.push(AppEvent::Updated(Box::new(view)));
        }
        events.extend(notices);
        events
    }

    fn changed_view(&mut self) -> Option<ClientView> {
        let view = self.client.view();
        if self.published.as_ref() == Some(&view) {
            return None;
        }
        self.published = Some(view.clone());
        Some(view)
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ClientAction::Send(command) => {
                    let name = command.event_name();
                    match command.into_packet() {
                        Ok(packet) => self.outgoing.push(packet),
                        Err(e) => tracing::warn!(event = name, error = %e, "cannot encode command"),
                    }
                },
                ClientAction::SendPacket(packet) => self.outgoing.push(packet),
                ClientAction::OpenChannel => {
                    self.channel_ops.push(ChannelOp::Open);
                    events.push(AppEvent::Connecting);
                },
                ClientAction::CloseChannel => self.channel_ops.push(ChannelOp::Close),
                ClientAction::Notify(notice) => events.push(AppEvent::Notice(notice)),
            }
        }

        events
    }
}
