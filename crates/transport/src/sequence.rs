//! Phased decoy send orchestration
//!
//! A detected handshake initiation is bracketed in two phases: a short
//! synchronous prefix that must finish before the initiation leaves, and an
//! asynchronous tail that delivers the remaining configured decoy volume
//! without holding up the caller. Splitting the burst this way bounds the
//! latency added to the real handshake while the full decoy volume still
//! goes out.

use crate::sender::DecoySender;
use mirage_obfuscation::{
    ObfuscationConfig, SIGNATURE_SLOTS, SignatureSet, generate_junk_packet,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Timing knobs for the phased sequence.
///
/// Defaults keep the synchronous phase within low tens of milliseconds.
/// Overrides must preserve that bound; the asynchronous tail has no such
/// constraint.
#[derive(Debug, Clone)]
pub struct SequenceTiming {
    /// Pause after I1 so it reliably leads the burst
    pub i1_settle: Duration,

    /// Delay between pre-handshake packets
    pub fast_delay: Duration,

    /// Final pause before the handshake is released
    pub final_settle: Duration,

    /// Cap on junk packets sent synchronously before the handshake
    pub pre_handshake_junk_cap: usize,

    /// Pause before the general junk train
    pub post_train_settle: Duration,

    /// Pause before the after-I1 junk train
    pub post_after_i1_settle: Duration,

    /// Pause before the after-handshake junk train
    pub post_after_hs_settle: Duration,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            i1_settle: Duration::from_millis(5),
            fast_delay: Duration::from_millis(3),
            final_settle: Duration::from_millis(2),
            pre_handshake_junk_cap: 3,
            post_train_settle: Duration::from_millis(50),
            post_after_i1_settle: Duration::from_millis(30),
            post_after_hs_settle: Duration::from_millis(50),
        }
    }
}

/// One obfuscation sequence around a single handshake initiation.
///
/// `run_pre_handshake` executes on the caller's send path;
/// `run_post_handshake` is spawned afterwards and never awaited. Both are
/// best-effort: a failed decoy send is logged by the sender and the
/// sequence moves on.
pub struct Sequence {
    config: Arc<ObfuscationConfig>,
    signatures: Arc<SignatureSet>,
    timing: SequenceTiming,
    sender: DecoySender,
}

impl Sequence {
    pub fn new(
        config: Arc<ObfuscationConfig>,
        signatures: Arc<SignatureSet>,
        timing: SequenceTiming,
        sender: DecoySender,
    ) -> Self {
        Self {
            config,
            signatures,
            timing,
            sender,
        }
    }

    /// Synchronous phase: I1, the follow-up signatures, then a capped junk
    /// prefix. Once this returns the real initiation is free to go out.
    pub async fn run_pre_handshake(&self) {
        // I1 leads, with its own settle so nothing overtakes it.
        if self.send_signature(0).await {
            sleep(self.timing.i1_settle).await;
        }

        for slot in 1..SIGNATURE_SLOTS {
            if self.send_signature(slot).await {
                sleep(self.timing.fast_delay).await;
            }
        }

        let before = self.config.junk_before_handshake();
        let capped = before.min(self.timing.pre_handshake_junk_cap);
        if capped > 0 {
            sleep(self.timing.fast_delay).await;
            self.send_junk_train(capped, self.timing.fast_delay).await;
        }

        sleep(self.timing.final_settle).await;

        let delay = self.config.handshake_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    /// Asynchronous tail: the decoy volume deferred out of the synchronous
    /// phase. Runs to completion regardless of send outcomes.
    pub async fn run_post_handshake(self) {
        let interval = self.config.junk_interval();

        let before = self.config.junk_before_handshake();
        if before > self.timing.pre_handshake_junk_cap {
            self.send_junk_train(before - self.timing.pre_handshake_junk_cap, interval)
                .await;
        }

        let train = self.config.junk_count();
        if train > 0 {
            sleep(self.timing.post_train_settle).await;
            self.send_junk_train(train, interval).await;
        }

        let after_i1 = self.config.junk_after_i1();
        if after_i1 > 0 {
            sleep(self.timing.post_after_i1_settle).await;
            self.send_junk_train(after_i1, interval).await;
        }

        let after_hs = self.config.junk_after_handshake();
        if after_hs > 0 {
            sleep(self.timing.post_after_hs_settle).await;
            self.send_junk_train(after_hs, interval).await;
        }

        debug!("Obfuscation sequence for {} complete", self.sender.target());
    }

    /// Resolve and send the signature in `slot`. Returns whether a packet
    /// actually went out.
    async fn send_signature(&self, slot: usize) -> bool {
        match self.signatures.resolve_slot(slot) {
            Ok(packet) if !packet.is_empty() => {
                self.sender.send(&packet).await;
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!("Skipping I{} signature: {}", slot + 1, e);
                false
            }
        }
    }

    /// Send `count` junk packets with `interval` between consecutive sends.
    async fn send_junk_train(&self, count: usize, interval: Duration) {
        let (jmin, jmax) = self.config.junk_bounds();
        for i in 0..count {
            let junk = generate_junk_packet(jmin, jmax, self.config.allow_zero_size);
            self.sender.send(&junk).await;
            if i + 1 < count && !interval.is_zero() {
                sleep(interval).await;
            }
        }
    }
}
