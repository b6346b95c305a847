//! Mirage Transport - capability trait and decorating bind
//!
//! This crate provides:
//! - The `UdpBind`/`Endpoint` capability traits the engine decorates
//! - `MirageBind`, a bind wrapper that brackets handshake initiations with
//!   decoy traffic
//! - Per-destination rate limiting for obfuscation sequences
//! - The phased decoy send orchestrator and its UDP sender

mod bind;
mod ratelimit;
mod sender;
mod sequence;

pub use bind::*;
pub use ratelimit::*;
pub use sender::*;
pub use sequence::*;

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;

/// Destination handle produced by `UdpBind::parse_endpoint`.
pub trait Endpoint: Send + Sync {
    /// Destination socket address of this endpoint
    fn dst_addr(&self) -> SocketAddr;
}

/// Transport capability the engine decorates.
///
/// Mirrors the conn surface of a userspace tunnel implementation: a bind
/// owns the local sockets and sends batches of datagrams to an endpoint.
/// `MirageBind` implements this same trait over any inner bind, decorating
/// `send` and delegating everything else.
#[async_trait]
pub trait UdpBind: Send + Sync {
    type Endpoint: Endpoint;

    /// Bind local sockets, returning the actual port
    async fn open(&self, port: u16) -> io::Result<u16>;

    /// Close the bind
    async fn close(&self) -> io::Result<()>;

    /// Set the routing mark on the underlying sockets
    fn set_mark(&self, mark: u32) -> io::Result<()>;

    /// Parse a destination endpoint from its string form
    fn parse_endpoint(&self, s: &str) -> io::Result<Self::Endpoint>;

    /// Maximum number of buffers a single `send` accepts
    fn batch_size(&self) -> usize;

    /// Send a batch of datagrams to an endpoint
    async fn send(&self, bufs: &[Vec<u8>], endpoint: &Self::Endpoint) -> io::Result<()>;
}
