//! Engine configuration
//!
//! `ObfuscationConfig` carries everything the engine needs to shape its
//! decoy traffic. It is immutable once constructed; share it behind an
//! `Arc` for concurrent reads.

use serde::Deserialize;
use std::time::Duration;

/// Cap applied to every configured junk packet count
pub const MAX_JUNK_COUNT: usize = 10;

/// Obfuscation engine configuration.
///
/// Every field has a default, so the struct can sit inside a host
/// application's TOML config and be filled in piecemeal. Out-of-range
/// values are clamped at use, never rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObfuscationConfig {
    /// First signature packet, sent ahead of everything else.
    /// Either a bare hex payload ("c0ffee", "0xC0FFEE") or a CPS template
    /// ("<b c0ffee><t><r 16>"). Empty disables the packet.
    pub i1: String,

    /// Second signature packet
    pub i2: String,

    /// Third signature packet
    pub i3: String,

    /// Fourth signature packet
    pub i4: String,

    /// Fifth signature packet
    pub i5: String,

    /// Random prefix size for handshake initiation packets, capped at 64
    pub s1: usize,

    /// Random prefix size for handshake response packets, capped at 64
    pub s2: usize,

    /// General junk train length
    pub jc: usize,

    /// Junk packets sent after the I1 signature
    pub jc_after_i1: usize,

    /// Junk packets sent before the handshake initiation
    pub jc_before_hs: usize,

    /// Junk packets sent after the handshake initiation
    pub jc_after_hs: usize,

    /// Minimum junk packet size in bytes
    pub jmin: usize,

    /// Maximum junk packet size in bytes
    pub jmax: usize,

    /// Interval between junk packets in milliseconds
    pub junk_interval_ms: u64,

    /// Extra delay before the real handshake is released, in milliseconds
    pub handshake_delay_ms: u64,

    /// Allow zero-size junk packets even when jmin > 0
    pub allow_zero_size: bool,

    /// Fixed destination port for decoy traffic. When unset, decoys go to
    /// the same port as the real handshake target.
    pub decoy_port: Option<u16>,

    /// Minimum interval between obfuscation sequences per destination,
    /// in milliseconds
    pub min_trigger_interval_ms: u64,
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            i1: String::new(),
            i2: String::new(),
            i3: String::new(),
            i4: String::new(),
            i5: String::new(),
            s1: 0,
            s2: 0,
            jc: 0,
            jc_after_i1: 0,
            jc_before_hs: 0,
            jc_after_hs: 0,
            jmin: 24,
            jmax: 1024,
            junk_interval_ms: 10,
            handshake_delay_ms: 0,
            allow_zero_size: false,
            decoy_port: None,
            min_trigger_interval_ms: 1_000,
        }
    }
}

impl ObfuscationConfig {
    /// Junk size bounds, swapped when configured min > max.
    pub fn junk_bounds(&self) -> (usize, usize) {
        if self.jmax < self.jmin {
            (self.jmax, self.jmin)
        } else {
            (self.jmin, self.jmax)
        }
    }

    /// General junk train length, capped
    pub fn junk_count(&self) -> usize {
        self.jc.min(MAX_JUNK_COUNT)
    }

    /// After-I1 junk count, capped
    pub fn junk_after_i1(&self) -> usize {
        self.jc_after_i1.min(MAX_JUNK_COUNT)
    }

    /// Before-handshake junk count, capped
    pub fn junk_before_handshake(&self) -> usize {
        self.jc_before_hs.min(MAX_JUNK_COUNT)
    }

    /// After-handshake junk count, capped
    pub fn junk_after_handshake(&self) -> usize {
        self.jc_after_hs.min(MAX_JUNK_COUNT)
    }

    /// Interval between junk packets
    pub fn junk_interval(&self) -> Duration {
        Duration::from_millis(self.junk_interval_ms)
    }

    /// Delay inserted before the real handshake is released
    pub fn handshake_delay(&self) -> Duration {
        Duration::from_millis(self.handshake_delay_ms)
    }

    /// Rate-limiter floor between sequences per destination
    pub fn min_trigger_interval(&self) -> Duration {
        Duration::from_millis(self.min_trigger_interval_ms)
    }
}
