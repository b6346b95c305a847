//! Decorating bind
//!
//! `MirageBind` wraps any `UdpBind` and re-exposes the identical surface.
//! Only `send` is decorated: outbound batches carrying a handshake
//! initiation trigger the phased decoy sequence, everything else passes
//! straight through. The wrapped batch itself is always forwarded
//! unchanged, whatever happens to the decoys.

use crate::sender::DecoySender;
use crate::sequence::{Sequence, SequenceTiming};
use crate::{Endpoint, RateLimiter, UdpBind};
use async_trait::async_trait;
use mirage_obfuscation::{CounterSource, CpsError, ObfuscationConfig, SignatureSet};
use mirage_protocol::batch_contains_initiation;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors constructing a `MirageBind`
#[derive(Error, Debug)]
pub enum BindError {
    /// A signature template failed to compile
    #[error("invalid signature template: {0}")]
    Template(#[from] CpsError),
}

/// Bind decorator that runs the obfuscation sequence around handshake
/// initiations.
#[derive(Debug)]
pub struct MirageBind<B> {
    inner: B,
    config: Arc<ObfuscationConfig>,
    signatures: Arc<SignatureSet>,
    timing: SequenceTiming,
    limiter: RateLimiter,
}

impl<B> MirageBind<B> {
    /// Wrap `inner`, compiling the configured signature templates.
    ///
    /// Malformed templates fail here, before any traffic is sent.
    pub fn new(inner: B, config: ObfuscationConfig) -> Result<Self, BindError> {
        Self::with_counter(inner, config, CounterSource::default())
    }

    /// As `new`, with an explicit `<c>` tag resolution strategy.
    pub fn with_counter(
        inner: B,
        config: ObfuscationConfig,
        counter: CounterSource,
    ) -> Result<Self, BindError> {
        let signatures = SignatureSet::compile(&config, counter)?;
        let limiter = RateLimiter::new(config.min_trigger_interval());
        Ok(Self {
            inner,
            config: Arc::new(config),
            signatures: Arc::new(signatures),
            timing: SequenceTiming::default(),
            limiter,
        })
    }

    /// Override the sequence timing knobs.
    pub fn with_timing(mut self, timing: SequenceTiming) -> Self {
        self.timing = timing;
        self
    }

    /// The wrapped bind
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: UdpBind> MirageBind<B> {
    /// Run the pre-handshake phase inline and spawn the tail when `bufs`
    /// carries an initiation the rate limiter admits.
    async fn maybe_obfuscate(&self, bufs: &[Vec<u8>], endpoint: &B::Endpoint) {
        if !batch_contains_initiation(bufs) {
            return;
        }

        let dst = endpoint.dst_addr();
        if !self.limiter.admit(dst.ip()) {
            debug!("Obfuscation sequence for {} rate-limited", dst.ip());
            return;
        }

        debug!("Handshake initiation to {}, running obfuscation sequence", dst);
        let sequence = Sequence::new(
            Arc::clone(&self.config),
            Arc::clone(&self.signatures),
            self.timing.clone(),
            DecoySender::new(dst, self.config.decoy_port),
        );

        sequence.run_pre_handshake().await;
        tokio::spawn(sequence.run_post_handshake());
    }
}

#[async_trait]
impl<B: UdpBind> UdpBind for MirageBind<B> {
    type Endpoint = B::Endpoint;

    async fn open(&self, port: u16) -> io::Result<u16> {
        self.inner.open(port).await
    }

    async fn close(&self) -> io::Result<()> {
        self.inner.close().await
    }

    fn set_mark(&self, mark: u32) -> io::Result<()> {
        self.inner.set_mark(mark)
    }

    fn parse_endpoint(&self, s: &str) -> io::Result<Self::Endpoint> {
        self.inner.parse_endpoint(s)
    }

    fn batch_size(&self) -> usize {
        self.inner.batch_size()
    }

    async fn send(&self, bufs: &[Vec<u8>], endpoint: &Self::Endpoint) -> io::Result<()> {
        self.maybe_obfuscate(bufs, endpoint).await;
        self.inner.send(bufs, endpoint).await
    }
}
