use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::{lookup_host, UdpSocket};

use super::{with_timeout, ConnectionError, Transport, TransportError};
use crate::context::Context;

/// Largest datagram accepted by [`Udp::read`]. One observation is well under 1 KiB.
pub const READ_BUFFER_SIZE: usize = 4096;

/// UDP transport. Each message is one JSON datagram to or from the peer.
pub struct Udp {
    socket: Option<UdpSocket>,
    peer: SocketAddr,
    read_timeout: Option<Duration>,
}

impl Udp {
    /// Resolve `addr` (`host:port`) and connect a UDP socket to it.
    pub async fn dial(addr: &str) -> Result<Self, ConnectionError> {
        let resolve_err = |reason: String| ConnectionError::Resolve {
            addr: addr.to_string(),
            reason,
        };
        let peer = lookup_host(addr)
            .await
            .map_err(|e| resolve_err(e.to_string()))?
            .next()
            .ok_or_else(|| resolve_err("no addresses found".to_string()))?;

        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        log::debug!(
            "UDP socket {} connected to {}",
            socket.local_addr()?,
            peer
        );

        Ok(Self {
            socket: Some(socket),
            peer,
            read_timeout: None,
        })
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket()?.local_addr()?)
    }

    fn socket(&self) -> Result<&UdpSocket, TransportError> {
        self.socket.as_ref().ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl Transport for Udp {
    async fn write(&mut self, ctx: &Context, message: &Value) -> Result<(), TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let datagram = serde_json::to_vec(message)?;
        let socket = self.socket()?;
        tokio::select! {
            _ = ctx.cancelled() => Err(TransportError::Cancelled),
            sent = socket.send(&datagram) => sent.map(|_| ()).map_err(TransportError::from),
        }
    }

    async fn read(&mut self, ctx: &Context) -> Result<Vec<u8>, TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let socket = self.socket()?;
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let n = tokio::select! {
            _ = ctx.cancelled() => return Err(TransportError::Cancelled),
            received = with_timeout(self.read_timeout, socket.recv(&mut buf)) => received??,
        };
        buf.truncate(n);
        Ok(buf)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.socket.take().is_some() {
            log::debug!("UDP socket to {} closed", self.peer);
        }
        Ok(())
    }
}
