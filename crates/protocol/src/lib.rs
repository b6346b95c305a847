//! Mirage Protocol - Outer wire shapes of the wrapped tunnel protocol
//!
//! This crate defines the little the obfuscation engine knows about the
//! tunnel it protects:
//! - Message type codes and minimum sizes
//! - `MessageKind`: outer classification of a datagram
//! - Batch scanning helpers for handshake detection
//!
//! Payloads stay opaque. Nothing here parses past the first byte.

mod message;

pub use message::*;
