//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. Network uses a WebSocket.

use std::{
    io::{self, Stdout, stdout},
    time::{Duration, Instant},
};

use aroundu_app::{App, AppAction, AppEvent, Driver, Inbound, KeyInput, Screen};
use aroundu_client::transport::{self, ConnectedClient, TransportError};
use aroundu_proto::Packet;
use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;

use crate::{InputState, ui};

/// How long `poll_event` waits for a key before ticking.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Opening the socket took too long.
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// Channel send error.
    #[error("channel send error")]
    ChannelSend,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm), rendering (ratatui), and network
/// communication (WebSocket). Owns the input state for text editing.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    connection: Option<ConnectedClient>,
    connect_timeout: Duration,
    input_state: InputState,
    /// Coordinates registered whenever a session asks for its location.
    location: Option<(f64, f64)>,
    last_screen: Option<Screen>,
}

impl TerminalDriver {
    /// Create a new terminal driver.
    pub fn new(connect_timeout: Duration) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let event_stream = EventStream::new();

        Ok(Self {
            terminal,
            event_stream,
            connection: None,
            connect_timeout,
            input_state: InputState::new(),
            location: None,
            last_screen: None,
        })
    }

    /// Register these coordinates automatically instead of waiting for
    /// `/locate`.
    #[must_use]
    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some((lat, lon));
        self
    }

    /// Convert crossterm `KeyCode` to `KeyInput`.
    fn convert_key(code: KeyCode) -> Option<KeyInput> {
        match code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Tab => Some(KeyInput::Tab),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }

    /// Fires once each time a session lands on the location screen.
    fn auto_locate(&mut self, app: &App) -> Vec<AppAction> {
        let screen = app.screen();
        let entered = self.last_screen != Some(screen) && screen == Screen::Location;
        self.last_screen = Some(screen);

        match self.location {
            Some((lat, lon)) if entered => {
                tracing::debug!(lat, lon, "registering configured location");
                app.register_location(lat, lon)
            },
            _ => vec![],
        }
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self, app: &mut App) -> Result<Vec<AppAction>, Self::Error> {
        let located = self.auto_locate(app);
        if !located.is_empty() {
            return Ok(located);
        }

        tokio::select! {
            biased;

            // Terminal events
            maybe_event = self.event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) if key_event.kind == KeyEventKind::Press => {
                        match Self::convert_key(key_event.code) {
                            Some(key_input) => Ok(self.input_state.handle_key(key_input, app)),
                            None => Ok(vec![]),
                        }
                    },
                    Some(Ok(Event::Resize(cols, rows))) => {
                        Ok(app.handle(AppEvent::Resize(cols, rows)))
                    },
                    Some(Err(e)) => Err(TerminalError::Io(e)),
                    _ => Ok(vec![]),
                }
            }

            // Tick timeout
            () = tokio::time::sleep(TICK_INTERVAL) => {
                Ok(app.handle(AppEvent::Tick))
            }
        }
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), Self::Error> {
        if let Some(conn) = &self.connection {
            conn.to_server.send(packet).await.map_err(|_| TerminalError::ChannelSend)?;
        }
        Ok(())
    }

    async fn recv_packet(&mut self) -> Option<Inbound> {
        let conn = self.connection.as_mut()?;
        match conn.from_server.try_recv() {
            Ok(packet) => Some(Inbound::Packet(packet)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Inbound::Closed { reason: "transport close".into() })
            },
        }
    }

    async fn connect(&mut self, addr: &str) -> Result<(), Self::Error> {
        let client = tokio::time::timeout(self.connect_timeout, transport::connect(addr))
            .await
            .map_err(|_| TerminalError::Timeout(self.connect_timeout))??;
        tracing::info!(server = addr, "connected");
        self.connection = Some(client);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.stop();
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| {
            ui::render(frame, app, &self.input_state);
        })?;
        Ok(())
    }

    fn stop(&mut self) {
        self.disconnect();
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
