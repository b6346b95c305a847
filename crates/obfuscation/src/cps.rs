//! CPS (Custom Protocol Signature) templates
//!
//! A CPS template describes the bytes of a decoy packet as a sequence of
//! tags: `<b HEX>` for literal bytes, `<c>` for a 4-byte counter, `<t>` for
//! a 4-byte Unix timestamp, `<r N>` for N random bytes. Text outside
//! recognized tags contributes nothing.
//!
//! Parsing and resolution are split: `parse` validates every tag up front
//! so malformed templates fail at engine construction, while `resolve`
//! re-draws the volatile tags on every call. Literal segments are
//! byte-identical across resolutions.

use crate::ObfuscationConfig;
use rand::RngCore;
use rand::rngs::OsRng;
use regex::Regex;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Cap on the byte count a single `<r>` tag may produce
pub const MAX_RANDOM_LEN: usize = 1000;

/// Number of signature slots (I1 through I5)
pub const SIGNATURE_SLOTS: usize = 5;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([btcr])\s*([^>]*)>").unwrap());

/// CPS template errors
#[derive(Error, Debug)]
pub enum CpsError {
    #[error("invalid hex data: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid length in <r> tag: {0:?}")]
    InvalidRandomLen(String),

    #[error("secure randomness unavailable: {0}")]
    Rng(String),

    #[error("invalid I{index} template: {source}")]
    Signature { index: usize, source: Box<CpsError> },
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(Vec<u8>),
    Counter,
    Timestamp,
    Random(usize),
}

/// Strategy for resolving the `<c>` tag.
///
/// The reference behavior derives the "counter" from wall-clock seconds;
/// protocols with a true per-packet counter can use `Sequential` instead.
#[derive(Debug, Default)]
pub enum CounterSource {
    /// Unix time in seconds, truncated to 32 bits
    #[default]
    WallClock,
    /// Monotonically incrementing per-resolution counter
    Sequential(AtomicU32),
}

impl CounterSource {
    /// A sequential counter starting at zero
    pub fn sequential() -> Self {
        Self::Sequential(AtomicU32::new(0))
    }

    fn next(&self) -> u32 {
        match self {
            Self::WallClock => unix_time_secs(),
            Self::Sequential(n) => n.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// A compiled CPS template.
#[derive(Debug, Clone, Default)]
pub struct CpsTemplate {
    segments: Vec<Segment>,
}

impl CpsTemplate {
    /// Parse a CPS tag template.
    ///
    /// A template without recognized tags (including the empty template)
    /// compiles to zero segments and resolves to zero bytes; that is not an
    /// error.
    pub fn parse(template: &str) -> Result<Self, CpsError> {
        let mut segments = Vec::new();

        for caps in TAG_RE.captures_iter(template) {
            let data = caps[2].trim();
            match &caps[1] {
                "b" => {
                    if !data.is_empty() {
                        segments.push(Segment::Literal(decode_hex(data)?));
                    }
                }
                "c" => segments.push(Segment::Counter),
                "t" => segments.push(Segment::Timestamp),
                "r" => segments.push(Segment::Random(parse_random_len(data)?)),
                _ => unreachable!("tag letter constrained by the pattern"),
            }
        }

        Ok(Self { segments })
    }

    /// Compile a signature template from its configured string form.
    ///
    /// A template containing a `<` is parsed as CPS tags; a non-empty
    /// template without one is the legacy form, a bare hex payload.
    pub fn compile_signature(template: &str) -> Result<Self, CpsError> {
        let trimmed = template.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        if !trimmed.contains('<') {
            return Ok(Self {
                segments: vec![Segment::Literal(decode_hex(trimmed)?)],
            });
        }
        Self::parse(trimmed)
    }

    /// Resolve the template into packet bytes.
    ///
    /// Counter, timestamp, and random segments are recomputed on every
    /// call. Random bytes come from the OS CSPRNG with no fallback; an
    /// unavailable secure source is the only resolve-time error.
    pub fn resolve(&self, counter: &CounterSource) -> Result<Vec<u8>, CpsError> {
        let mut out = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(bytes) => out.extend_from_slice(bytes),
                Segment::Counter => out.extend_from_slice(&counter.next().to_be_bytes()),
                Segment::Timestamp => out.extend_from_slice(&unix_time_secs().to_be_bytes()),
                Segment::Random(len) => {
                    let start = out.len();
                    out.resize(start + len, 0);
                    OsRng
                        .try_fill_bytes(&mut out[start..])
                        .map_err(|e| CpsError::Rng(e.to_string()))?;
                }
            }
        }
        Ok(out)
    }
}

/// The compiled I1-I5 signature templates plus their shared counter
/// strategy.
#[derive(Debug)]
pub struct SignatureSet {
    templates: [CpsTemplate; SIGNATURE_SLOTS],
    counter: CounterSource,
}

impl SignatureSet {
    /// Compile all five signature templates from the configuration.
    ///
    /// The first malformed template aborts compilation with its slot
    /// number attached.
    pub fn compile(config: &ObfuscationConfig, counter: CounterSource) -> Result<Self, CpsError> {
        let templates = [
            compile_slot(&config.i1, 1)?,
            compile_slot(&config.i2, 2)?,
            compile_slot(&config.i3, 3)?,
            compile_slot(&config.i4, 4)?,
            compile_slot(&config.i5, 5)?,
        ];
        Ok(Self { templates, counter })
    }

    /// Resolve the template in `slot` (0-based, I1 is slot 0).
    pub fn resolve_slot(&self, slot: usize) -> Result<Vec<u8>, CpsError> {
        self.templates[slot].resolve(&self.counter)
    }
}

fn compile_slot(template: &str, index: usize) -> Result<CpsTemplate, CpsError> {
    CpsTemplate::compile_signature(template).map_err(|e| CpsError::Signature {
        index,
        source: Box::new(e),
    })
}

/// Decode hex with an optional 0x/0X prefix and embedded whitespace.
fn decode_hex(data: &str) -> Result<Vec<u8>, CpsError> {
    let data = data
        .strip_prefix("0x")
        .or_else(|| data.strip_prefix("0X"))
        .unwrap_or(data);
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(hex::decode(compact)?)
}

/// Parse the `<r>` length, clamping to [0, 1000]. Missing length means 0.
fn parse_random_len(data: &str) -> Result<usize, CpsError> {
    if data.is_empty() {
        return Ok(0);
    }
    let len: i64 = data
        .parse()
        .map_err(|_| CpsError::InvalidRandomLen(data.to_string()))?;
    Ok(len.clamp(0, MAX_RANDOM_LEN as i64) as usize)
}

fn unix_time_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as u32
}
