// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use atp_error::{Error, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

// ---------------------------------------------------------------------------
// Transport capability
// ---------------------------------------------------------------------------

/// A message received from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// A binary frame.
    Binary(Vec<u8>),
    /// A text frame.
    Text(String),
}

/// One live WebSocket connection.
#[async_trait]
pub trait WebSocketConnection: Send {
    /// The next message; `None` after a clean close.
    async fn receive(&mut self) -> Result<Option<WsMessage>>;

    /// Close the connection with a normal-closure code.
    async fn close(&mut self) -> Result<()>;
}

/// Opens WebSocket connections.
#[async_trait]
pub trait WebSocketTransport: Send + Sync {
    /// Connect to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>>;
}

// ---------------------------------------------------------------------------
// Tungstenite implementation
// ---------------------------------------------------------------------------

/// Production [`WebSocketTransport`] backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    /// A new transport.
    pub fn new() -> Self {
        Self
    }
}

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl WebSocketTransport for TungsteniteTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>> {
        debug!(%url, "opening websocket");
        let (stream, _response) = connect_async(url).await.map_err(Error::network)?;
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

#[async_trait]
impl WebSocketConnection for TungsteniteConnection {
    async fn receive(&mut self) -> Result<Option<WsMessage>> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(Error::network(e)),
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(Some(WsMessage::Binary(bytes.to_vec())))
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(WsMessage::Text(text.as_str().to_owned())))
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                // Ping/pong frames are transport noise.
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            })))
            .await
            .map_err(Error::network)
    }
}
