//! Short-lived UDP sends for decoy traffic
//!
//! Every decoy datagram goes out on its own ephemeral socket with a write
//! deadline. Failures are logged and dropped: decoys are best-effort and
//! must never stall the caller's handshake or each other.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Deadline applied to each decoy datagram send
pub const SEND_TIMEOUT: Duration = Duration::from_millis(400);

/// Decoy datagram sender aimed at one destination.
#[derive(Debug, Clone, Copy)]
pub struct DecoySender {
    target: SocketAddr,
}

impl DecoySender {
    /// Aim at `dst`, optionally redirecting to a fixed decoy port on the
    /// same host.
    pub fn new(dst: SocketAddr, port_override: Option<u16>) -> Self {
        let target = match port_override {
            Some(port) => SocketAddr::new(dst.ip(), port),
            None => dst,
        };
        Self { target }
    }

    /// Destination of this sender's datagrams
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one datagram, best-effort.
    ///
    /// Zero-length payloads go out as true zero-byte datagrams. Errors and
    /// timeouts are logged and swallowed.
    pub async fn send(&self, payload: &[u8]) {
        let bind_addr: SocketAddr = match self.target.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = match UdpSocket::bind(bind_addr).await {
            Ok(socket) => socket,
            Err(e) => {
                debug!("Decoy socket bind failed: {}", e);
                return;
            }
        };

        match timeout(SEND_TIMEOUT, socket.send_to(payload, self.target)).await {
            Ok(Ok(n)) => trace!("Sent {} decoy bytes to {}", n, self.target),
            Ok(Err(e)) => debug!("Decoy send to {} failed: {}", self.target, e),
            Err(_) => debug!("Decoy send to {} timed out", self.target),
        }
    }
}
