// ============================================
// File: crates/palisade-core/src/protocol/codec.rs
// ============================================
//! # Capability Message Codec
//!
//! ## Creation Reason
//! Provides binary serialization and deserialization for the base-protocol
//! messages carried in frames.
//!
//! ## Parsing Strategy
//! 1. Check remaining length before every read
//! 2. Read fixed fields, then length-prefixed variable fields
//! 3. Validate all fields
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always validate buffer lengths before reading
//! - Strings are length-prefixed with a single byte (capped at 255)

use bytes::{Buf, BufMut, Bytes, BytesMut};

use palisade_common::types::{NodeId, NODE_ID_SIZE};

use crate::error::{CoreError, Result};
use crate::protocol::messages::{Capability, Disconnect, DisconnectReason, Hello};
use crate::protocol::version::ProtocolVersion;

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding base-protocol messages.
pub trait Codec<T> {
    /// Encodes a message into a byte buffer.
    fn encode(&self, msg: &T, buf: &mut BytesMut);

    /// Decodes a message from bytes.
    ///
    /// # Errors
    /// Returns an error if decoding fails.
    fn decode(&self, buf: &mut Bytes) -> Result<T>;
}

// ============================================
// ProtocolCodec
// ============================================

/// Codec implementation for all base-protocol messages.
#[derive(Debug, Default, Clone)]
pub struct ProtocolCodec;

impl ProtocolCodec {
    /// Creates a new protocol codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn put_short_string(buf: &mut BytesMut, value: &str) {
    // Names are capped at 255 bytes on the wire
    let bytes = value.as_bytes();
    let len = bytes.len().min(u8::MAX as usize);
    buf.put_u8(len as u8);
    buf.put_slice(&bytes[..len]);
}

fn get_short_string(buf: &mut Bytes, context: &str) -> Result<String> {
    if buf.remaining() < 1 {
        return Err(CoreError::too_short(1, 0));
    }
    let len = buf.get_u8() as usize;
    if buf.remaining() < len {
        return Err(CoreError::too_short(len, buf.remaining()));
    }
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|_| CoreError::malformed(format!("{context}: invalid utf-8")))
}

// ============================================
// Hello Codec
// ============================================

impl Codec<Hello> for ProtocolCodec {
    fn encode(&self, msg: &Hello, buf: &mut BytesMut) {
        buf.put_u8(msg.version.as_u8());
        put_short_string(buf, &msg.client_name);
        buf.put_u8(msg.capabilities.len().min(u8::MAX as usize) as u8);
        for cap in msg.capabilities.iter().take(u8::MAX as usize) {
            put_short_string(buf, &cap.name);
            buf.put_u8(cap.version);
        }
        buf.put_slice(msg.node_id.as_bytes());
    }

    fn decode(&self, buf: &mut Bytes) -> Result<Hello> {
        if buf.remaining() < 1 {
            return Err(CoreError::too_short(1, 0));
        }
        let version = ProtocolVersion::new(buf.get_u8());
        let client_name = get_short_string(buf, "client name")?;

        if buf.remaining() < 1 {
            return Err(CoreError::too_short(1, 0));
        }
        let count = buf.get_u8() as usize;
        let mut capabilities = Vec::with_capacity(count);
        for _ in 0..count {
            let name = get_short_string(buf, "capability name")?;
            if buf.remaining() < 1 {
                return Err(CoreError::too_short(1, 0));
            }
            capabilities.push(Capability {
                name,
                version: buf.get_u8(),
            });
        }

        if buf.remaining() < NODE_ID_SIZE {
            return Err(CoreError::too_short(NODE_ID_SIZE, buf.remaining()));
        }
        let mut id = [0u8; NODE_ID_SIZE];
        buf.copy_to_slice(&mut id);
        let node_id = NodeId::from_bytes(id);

        if buf.has_remaining() {
            return Err(CoreError::malformed("trailing bytes after hello"));
        }

        Ok(Hello {
            version,
            client_name,
            capabilities,
            node_id,
        })
    }
}

// ============================================
// Disconnect Codec
// ============================================

impl Codec<Disconnect> for ProtocolCodec {
    fn encode(&self, msg: &Disconnect, buf: &mut BytesMut) {
        buf.put_u8(msg.reason.as_byte());
    }

    fn decode(&self, buf: &mut Bytes) -> Result<Disconnect> {
        if buf.remaining() < 1 {
            return Err(CoreError::too_short(1, 0));
        }
        let byte = buf.get_u8();
        let reason = DisconnectReason::from_byte(byte)
            .ok_or_else(|| CoreError::malformed(format!("unknown disconnect reason 0x{byte:02x}")))?;
        Ok(Disconnect { reason })
    }
}

// ============================================
// Convenience Functions
// ============================================

/// Encodes a hello message to bytes.
#[must_use]
pub fn encode_hello(msg: &Hello) -> BytesMut {
    let mut buf = BytesMut::new();
    ProtocolCodec.encode(msg, &mut buf);
    buf
}

/// Decodes a hello message from bytes.
pub fn decode_hello(buf: &[u8]) -> Result<Hello> {
    let mut bytes = Bytes::copy_from_slice(buf);
    Codec::<Hello>::decode(&ProtocolCodec, &mut bytes)
}

/// Encodes a disconnect notice to bytes.
#[must_use]
pub fn encode_disconnect(msg: &Disconnect) -> BytesMut {
    let mut buf = BytesMut::new();
    ProtocolCodec.encode(msg, &mut buf);
    buf
}

/// Decodes a disconnect notice from bytes.
pub fn decode_disconnect(buf: &[u8]) -> Result<Disconnect> {
    let mut bytes = Bytes::copy_from_slice(buf);
    Codec::<Disconnect>::decode(&ProtocolCodec, &mut bytes)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hello() -> Hello {
        Hello::new(
            "palisade/0.1.0",
            vec![Capability::new("pls", 3), Capability::new("snap", 1)],
            NodeId::random(),
        )
    }

    #[test]
    fn test_hello_roundtrip() {
        let hello = sample_hello();
        let encoded = encode_hello(&hello);
        let decoded = decode_hello(&encoded).unwrap();
        assert_eq!(hello, decoded);
    }

    #[test]
    fn test_hello_without_capabilities() {
        let hello = Hello::new("bare", vec![], NodeId::random());
        let decoded = decode_hello(&encode_hello(&hello)).unwrap();
        assert!(decoded.capabilities.is_empty());
    }

    #[test]
    fn test_hello_truncated_fails() {
        let encoded = encode_hello(&sample_hello());
        for cut in [0, 1, 5, encoded.len() - 1] {
            assert!(decode_hello(&encoded[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_hello_trailing_bytes_fail() {
        let mut encoded = encode_hello(&sample_hello()).to_vec();
        encoded.push(0x00);
        assert!(matches!(
            decode_hello(&encoded),
            Err(CoreError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_disconnect_roundtrip() {
        let msg = Disconnect::new(DisconnectReason::TooManyPeers);
        let decoded = decode_disconnect(&encode_disconnect(&msg)).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_disconnect_unknown_reason_fails() {
        assert!(matches!(
            decode_disconnect(&[0xEE]),
            Err(CoreError::MalformedMessage { .. })
        ));
        assert!(decode_disconnect(&[]).is_err());
    }
}
