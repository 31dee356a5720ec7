//! Error types for Tempest transports.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised while establishing a connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Scheme is neither a websocket scheme nor `udp`
    #[error("unsupported connection protocol: {0}")]
    UnsupportedProtocol(String),

    /// The websocket URL could not be built from host and path
    #[error("invalid websocket url: {0}")]
    InvalidUrl(String),

    /// The UDP peer address could not be resolved
    #[error("could not resolve {addr}: {reason}")]
    Resolve { addr: String, reason: String },

    /// Websocket dial or handshake failure
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),

    /// Socket setup failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dial abandoned because the context was cancelled
    #[error("connect cancelled")]
    Cancelled,
}

impl ConnectionError {
    /// Whether retrying with the same parameters can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::UnsupportedProtocol(_) | Self::InvalidUrl(_))
    }
}

/// Errors raised by an established transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The context was cancelled before or during the operation
    #[error("operation cancelled")]
    Cancelled,

    /// The transport was closed, locally or by the peer
    #[error("connection closed")]
    Closed,

    /// No message arrived within the configured read timeout
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The outgoing message could not be encoded as JSON
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}
