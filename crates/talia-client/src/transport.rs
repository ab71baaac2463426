// Realtime channel abstraction and its WebSocket implementation.
//
// The connection manager only ever sees `Connector` and `Channel`, so tests
// can drive the whole session with in-memory channels.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("channel closed")]
    Closed,
}

/// One open bidirectional text channel.
#[async_trait]
pub trait Channel: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame. `None` means the peer closed the channel.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close with a normal (deliberate) close code.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens channels for a (session, participant) pair.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<Box<dyn Channel>, TransportError>;
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    ws_base: String,
}

impl TungsteniteConnector {
    pub fn new(ws_base: impl Into<String>) -> Self {
        TungsteniteConnector {
            ws_base: ws_base.into(),
        }
    }

    pub fn channel_url(&self, session_id: &str, participant_id: &str) -> String {
        format!(
            "{}/ws/game/{session_id}/{participant_id}",
            self.ws_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn open(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<Box<dyn Channel>, TransportError> {
        let url = self.channel_url(session_id, participant_id);
        debug!(%url, "opening websocket");
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Ok(Box::new(WsChannel { stream }))
    }
}

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "peer sent close frame");
                    return None;
                }
                // Pings are answered by tungstenite; binary frames are not part
                // of the protocol.
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client closed session".into(),
        };
        self.stream.close(Some(frame)).await?;
        Ok(())
    }
}
