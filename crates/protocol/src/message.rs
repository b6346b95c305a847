//! Message classification for the wrapped tunnel protocol
//!
//! The tunnel frames every datagram with a one-byte type code. The engine
//! only ever looks at that byte and the datagram length; the cryptographic
//! payload behind them is never touched.

/// Type code of a handshake initiation message
pub const MESSAGE_INITIATION_TYPE: u8 = 1;

/// Type code of a handshake response message
pub const MESSAGE_RESPONSE_TYPE: u8 = 2;

/// Type code of a cookie reply message
pub const MESSAGE_COOKIE_REPLY_TYPE: u8 = 3;

/// Type code of a transport data message
pub const MESSAGE_TRANSPORT_TYPE: u8 = 4;

/// Minimum size of a handshake initiation message
pub const MESSAGE_INITIATION_SIZE: usize = 148;

/// Minimum size of a handshake response message
pub const MESSAGE_RESPONSE_SIZE: usize = 92;

/// Outer classification of a single datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// First message of the key exchange
    Initiation,
    /// Second message of the key exchange
    Response,
    /// Cookie reply used for DoS mitigation
    CookieReply,
    /// Encrypted transport data
    Transport,
    /// Anything else, including truncated handshake messages
    Unknown,
}

impl MessageKind {
    /// Classify a datagram by its type byte and length floor.
    ///
    /// The reserved bytes that follow the type are not validated: some
    /// deployed peers repurpose them, so a strict check would misclassify
    /// their handshakes.
    pub fn classify(buf: &[u8]) -> Self {
        match buf.first() {
            Some(&MESSAGE_INITIATION_TYPE) if buf.len() >= MESSAGE_INITIATION_SIZE => {
                Self::Initiation
            }
            Some(&MESSAGE_RESPONSE_TYPE) if buf.len() >= MESSAGE_RESPONSE_SIZE => Self::Response,
            Some(&MESSAGE_COOKIE_REPLY_TYPE) => Self::CookieReply,
            Some(&MESSAGE_TRANSPORT_TYPE) => Self::Transport,
            _ => Self::Unknown,
        }
    }
}

/// Reports whether `buf` is shaped like a handshake initiation.
pub fn is_handshake_initiation(buf: &[u8]) -> bool {
    MessageKind::classify(buf) == MessageKind::Initiation
}

/// Reports whether any buffer in an outbound batch is shaped like a
/// handshake initiation.
pub fn batch_contains_initiation<B: AsRef<[u8]>>(bufs: &[B]) -> bool {
    bufs.iter().any(|b| is_handshake_initiation(b.as_ref()))
}
