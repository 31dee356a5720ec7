//! Transports to a Tempest device.
//!
//! A [`Transport`] hides the difference between the websocket gateway and a
//! UDP peer behind three operations: write a JSON message, read one raw
//! message, close. [`connect`] picks the variant from the configured scheme.

mod error;
mod udp;
mod websocket;

#[cfg(test)]
pub mod mock;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::context::Context;

pub use error::{ConnectionError, TransportError};
pub use udp::{Udp, READ_BUFFER_SIZE};
pub use websocket::WebSocket;

/// Query parameter carrying the bearer token on the websocket URL.
pub const TOKEN_PARAM: &str = "token";

/// Capability set shared by every transport variant.
#[async_trait]
pub trait Transport: Send {
    /// Encode `message` as JSON and send it as a single frame or datagram.
    ///
    /// Fails with [`TransportError::Cancelled`] without touching the socket
    /// when `ctx` is already cancelled.
    async fn write(&mut self, ctx: &Context, message: &Value) -> Result<(), TransportError>;

    /// Block until one message is available and return its raw bytes.
    async fn read(&mut self, ctx: &Context) -> Result<Vec<u8>, TransportError>;

    /// Release the socket. Closing twice is not an error.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// A dialed transport, either variant.
pub enum Connection {
    WebSocket(WebSocket),
    Udp(Udp),
}

impl Connection {
    /// Bound every read by `timeout`. `None` waits indefinitely.
    pub fn with_read_timeout(self, timeout: Option<Duration>) -> Self {
        match self {
            Self::WebSocket(ws) => Self::WebSocket(ws.with_read_timeout(timeout)),
            Self::Udp(udp) => Self::Udp(udp.with_read_timeout(timeout)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::WebSocket(_) => "websocket",
            Self::Udp(_) => "udp",
        }
    }
}

#[async_trait]
impl Transport for Connection {
    async fn write(&mut self, ctx: &Context, message: &Value) -> Result<(), TransportError> {
        match self {
            Self::WebSocket(ws) => ws.write(ctx, message).await,
            Self::Udp(udp) => udp.write(ctx, message).await,
        }
    }

    async fn read(&mut self, ctx: &Context) -> Result<Vec<u8>, TransportError> {
        match self {
            Self::WebSocket(ws) => ws.read(ctx).await,
            Self::Udp(udp) => udp.read(ctx).await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self {
            Self::WebSocket(ws) => ws.close().await,
            Self::Udp(udp) => udp.close().await,
        }
    }
}

/// Dial a Tempest device.
///
/// `scheme` is matched case-insensitively: `wss`/`ws` dial
/// `<scheme>://<host><path>?token=<token>`, `udp` connects a UDP socket to
/// `host` (a `host:port` pair; `path` and `token` are unused). No retry is
/// attempted here.
pub async fn connect(
    scheme: &str,
    host: &str,
    path: &str,
    token: &str,
) -> Result<Connection, ConnectionError> {
    match scheme.to_ascii_lowercase().as_str() {
        scheme @ ("wss" | "ws") => {
            let url = websocket_url(scheme, host, path, token)?;
            log::info!("Dialing {}://{}{}", scheme, host, url.path());
            Ok(Connection::WebSocket(WebSocket::dial(url.as_str()).await?))
        }
        "udp" => {
            log::info!("Connecting UDP socket to {}", host);
            Ok(Connection::Udp(Udp::dial(host).await?))
        }
        _ => Err(ConnectionError::UnsupportedProtocol(scheme.to_string())),
    }
}

/// Build the websocket URL with the token in the `token` query parameter.
pub fn websocket_url(
    scheme: &str,
    host: &str,
    path: &str,
    token: &str,
) -> Result<Url, ConnectionError> {
    let mut url = Url::parse(&format!("{}://{}", scheme, host))
        .map_err(|e| ConnectionError::InvalidUrl(format!("{}://{}: {}", scheme, host, e)))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConnectionError::InvalidUrl(format!(
            "{}://{}: missing host",
            scheme, host
        )));
    }
    url.set_path(path);
    url.query_pairs_mut().append_pair(TOKEN_PARAM, token);
    Ok(url)
}

/// Await `fut`, failing with [`TransportError::Timeout`] after `limit`.
pub(crate) async fn with_timeout<F: Future>(
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, TransportError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TransportError::Timeout(limit)),
        None => Ok(fut.await),
    }
}
