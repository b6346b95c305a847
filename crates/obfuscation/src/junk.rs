//! Junk packet generation
//!
//! Junk packets are randomly sized filler datagrams (zero-size included)
//! sent around the real handshake to blur its size and timing fingerprint.
//! Their content carries no meaning, so generation never fails: if the OS
//! CSPRNG is unavailable the fill degrades to the thread-local generator.

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::warn;

/// Generate one junk packet within `[min, max]` bytes.
///
/// Zero-size handling, in priority order:
/// - `min == 0 && max == 0` always yields an empty packet
/// - `min == 0` draws the size from `[0, max]` and may yield an empty packet
/// - `allow_zero` with `min > 0` yields an empty packet half the time
///
/// When `max < min` the range collapses to `[min, min]`.
pub fn generate_junk_packet(min: usize, max: usize, allow_zero: bool) -> Vec<u8> {
    if min == 0 && max == 0 {
        return Vec::new();
    }

    if min == 0 {
        let size = fastrand::usize(0..=max);
        if size == 0 {
            return Vec::new();
        }
        return random_bytes(size);
    }

    if allow_zero && fastrand::bool() {
        return Vec::new();
    }

    let max = max.max(min);
    random_bytes(fastrand::usize(min..=max))
}

fn random_bytes(size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; size];
    fill_decoy_bytes(&mut buf);
    buf
}

/// Fill `buf` from the OS CSPRNG, degrading to the thread-local generator
/// when the secure source fails.
///
/// Decoy content only. Template randomness (`<r>` tags) never takes the
/// fallback path.
pub(crate) fn fill_decoy_bytes(buf: &mut [u8]) {
    if let Err(e) = OsRng.try_fill_bytes(buf) {
        warn!("Secure RNG unavailable, decoy bytes degraded to fastrand: {}", e);
        for b in buf.iter_mut() {
            *b = fastrand::u8(..);
        }
    }
}
