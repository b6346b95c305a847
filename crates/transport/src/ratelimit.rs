//! Per-destination trigger rate limiting
//!
//! An unanswered handshake initiation is retransmitted every few seconds;
//! without a floor every retransmission would replay the full decoy burst
//! and hand DPI a repeating pattern.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Per-destination throttle for obfuscation sequences.
///
/// Keyed by destination IP rather than ip:port so retransmissions from a
/// re-bound source port still coalesce.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_trigger: Mutex<HashMap<IpAddr, Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_trigger: Mutex::new(HashMap::new()),
        }
    }

    /// Admit a trigger for `dst`, stamping it as that destination's last
    /// trigger time.
    ///
    /// Returns false with no state change while the previous admitted
    /// trigger is closer than the configured interval.
    pub fn admit(&self, dst: IpAddr) -> bool {
        let now = Instant::now();
        let mut last_trigger = self.last_trigger.lock();

        if let Some(last) = last_trigger.get(&dst) {
            if now.duration_since(*last) < self.interval {
                return false;
            }
        }
        last_trigger.insert(dst, now);
        true
    }
}
