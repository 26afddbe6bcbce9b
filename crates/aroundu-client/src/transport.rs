//! WebSocket transport for the client.
//!
//! Provides [`ConnectedClient`] which carries Engine.IO packets over a
//! WebSocket. This is a thin layer that only frames and moves packets;
//! protocol logic remains in the Sans-IO [`crate::Client`].

use aroundu_proto::{Packet, websocket_url};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Packet could not be framed.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Handle to a connected WebSocket.
///
/// Packets are sent and received via the channels; an internal task handles
/// the socket I/O. When the socket closes, `from_server` yields `None`.
pub struct ConnectedClient {
    /// Send packets to the server.
    pub to_server: mpsc::Sender<Packet>,
    /// Receive packets from the server.
    pub from_server: mpsc::Receiver<Packet>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectedClient {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Connect to an AroundU server.
///
/// `server` is the HTTP base URL (`http://host:5004`); the Socket.IO
/// WebSocket path is appended.
pub async fn connect(server: &str) -> Result<ConnectedClient, TransportError> {
    let url = websocket_url(server);
    tracing::debug!(%url, "opening websocket");

    let (stream, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<Packet>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<Packet>(32);

    let handle = tokio::spawn(run_connection(stream, to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the connection, bridging between channels and the socket.
async fn run_connection(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut to_server: mpsc::Receiver<Packet>,
    from_server: mpsc::Sender<Packet>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(packet) = outgoing else {
                    let _ = sink.close().await;
                    break;
                };
                let text = match packet.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %TransportError::Protocol(e.to_string()), "dropping outgoing packet");
                        continue;
                    },
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    tracing::warn!(error = %e, "websocket write failed");
                    break;
                }
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => match Packet::decode(&text) {
                    Ok(packet) => {
                        if from_server.send(packet).await.is_err() {
                            break;
                        }
                    },
                    Err(e) => tracing::warn!(error = %e, "undecodable packet"),
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "websocket closed by server");
                    break;
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "websocket read failed");
                    break;
                },
                None => break,
            },
        }
    }
}
