//! Random prefix injection for handshake packets
//!
//! Prepending a short random prefix moves the tunnel's fixed leading bytes
//! off their well-known offsets. Only handshake initiation and response
//! packets are prefixed; transport and cookie packets pass through
//! byte-identical so peers that do not strip prefixes keep interoperating.
//!
//! The default send path leaves this off; an integrating bind enables it
//! when both ends of the deployment understand prefixed handshakes.

use crate::ObfuscationConfig;
use crate::junk::fill_decoy_bytes;
use mirage_protocol::MessageKind;

/// Cap applied to the configured prefix sizes
pub const MAX_PREFIX_SIZE: usize = 64;

/// Prepend the configured random prefix to a handshake packet.
///
/// Initiation packets get an `s1`-byte prefix, response packets `s2`,
/// everything else is returned unchanged. Sizes are capped at 64 bytes.
pub fn apply_prefix(config: &ObfuscationConfig, buf: &[u8]) -> Vec<u8> {
    let size = match MessageKind::classify(buf) {
        MessageKind::Initiation => config.s1,
        MessageKind::Response => config.s2,
        _ => 0,
    };
    let size = size.min(MAX_PREFIX_SIZE);
    if size == 0 {
        return buf.to_vec();
    }

    let mut out = vec![0u8; size + buf.len()];
    fill_decoy_bytes(&mut out[..size]);
    out[size..].copy_from_slice(buf);
    out
}
