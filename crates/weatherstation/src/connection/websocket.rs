use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{with_timeout, ConnectionError, Transport, TransportError};
use crate::context::Context;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Websocket transport. Messages are JSON text frames.
pub struct WebSocket {
    stream: Option<WsStream>,
    read_timeout: Option<Duration>,
}

impl WebSocket {
    /// Dial `url` and complete the websocket handshake.
    pub async fn dial(url: &str) -> Result<Self, ConnectionError> {
        let (stream, response) = connect_async(url).await?;
        log::debug!("Websocket handshake complete ({})", response.status());
        Ok(Self {
            stream: Some(stream),
            read_timeout: None,
        })
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn stream(&mut self) -> Result<&mut WsStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl Transport for WebSocket {
    async fn write(&mut self, ctx: &Context, message: &Value) -> Result<(), TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let text = serde_json::to_string(message)?;
        let stream = self.stream()?;
        tokio::select! {
            _ = ctx.cancelled() => Err(TransportError::Cancelled),
            sent = stream.send(Message::Text(text.into())) => sent.map_err(TransportError::from),
        }
    }

    async fn read(&mut self, ctx: &Context) -> Result<Vec<u8>, TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let read_timeout = self.read_timeout;
        let stream = self.stream()?;
        loop {
            let next = tokio::select! {
                _ = ctx.cancelled() => return Err(TransportError::Cancelled),
                next = with_timeout(read_timeout, stream.next()) => next?,
            };

            match next {
                Some(Ok(Message::Text(text))) => return Ok(text.as_bytes().to_vec()),
                Some(Ok(Message::Binary(data))) => return Ok(data.to_vec()),
                Some(Ok(Message::Close(frame))) => {
                    log::debug!("Peer closed websocket: {:?}", frame);
                    return Err(TransportError::Closed);
                }
                // Pings are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(tungstenite::Error::ConnectionClosed)) | None => {
                    return Err(TransportError::Closed)
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        match stream.close(Some(frame)).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
