// ============================================
// File: crates/palisade-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the node identifier type used throughout the Palisade
//! transport, ensuring type safety and a consistent wire representation.
//!
//! ## Main Functionality
//! - `NodeId`: Unique identifier for a node (64 bytes)
//! - Type conversions and serialization implementations
//!
//! ## Main Logical Flow
//! 1. A `NodeId` is derived from a node's static public key
//! 2. Carried in the capability hello and compared against the key proven
//!    by the encryption handshake
//! 3. Serialized as hex for configuration and logs
//!
//! ## ⚠️ Important Note for Next Developer
//! - A `NodeId` is the uncompressed static public key without the format
//!   byte - it is public data, safe to log and serialize
//! - Maintain backward-compatible serialization formats

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of a `NodeId` in bytes (uncompressed public key, no format byte).
pub const NODE_ID_SIZE: usize = 64;

// ============================================
// NodeId
// ============================================

/// Unique identifier for a node on the network.
///
/// # Wire Format
/// ```text
/// ┌──────────────────────────────────────────┐
/// │            Node ID (64 bytes)            │
/// │  uncompressed static public key, no tag  │
/// └──────────────────────────────────────────┘
/// ```
///
/// # Example
/// ```
/// use palisade_common::types::NodeId;
///
/// let id = NodeId::from_bytes([0x42u8; 64]);
/// let hex = id.to_string();
/// let restored: NodeId = hex.parse().unwrap();
/// assert_eq!(id, restored);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId([u8; NODE_ID_SIZE]);

impl NodeId {
    /// Creates a `NodeId` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; NODE_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a `NodeId` from a byte slice.
    ///
    /// # Errors
    /// Returns `InvalidLength` if the slice is not exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CommonError> {
        if bytes.len() != NODE_ID_SIZE {
            return Err(CommonError::invalid_length(NODE_ID_SIZE, bytes.len()));
        }
        let mut id = [0u8; NODE_ID_SIZE];
        id.copy_from_slice(bytes);
        Ok(Self(id))
    }

    /// Generates a random `NodeId`.
    ///
    /// Intended for tests and fixtures; real identifiers are derived from
    /// static public keys.
    #[must_use]
    pub fn random() -> Self {
        let mut id = [0u8; NODE_ID_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut id);
        Self(id)
    }

    /// Returns a reference to the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; NODE_ID_SIZE] {
        &self.0
    }

    /// Returns the raw bytes (owned).
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; NODE_ID_SIZE] {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Truncated hex keeps log lines readable
        write!(
            f,
            "NodeId({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl FromStr for NodeId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CommonError::Decoding {
            context: format!("node id hex: {e}"),
        })?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(self.0))
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            Self::from_slice(&bytes).map_err(serde::de::Error::custom)
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_roundtrip() {
        let id = NodeId::from_bytes([0xABu8; NODE_ID_SIZE]);
        let hex = id.to_string();
        assert_eq!(hex.len(), NODE_ID_SIZE * 2);

        let restored: NodeId = hex.parse().unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn test_node_id_from_slice_rejects_bad_length() {
        assert!(NodeId::from_slice(&[0u8; 32]).is_err());
        assert!(NodeId::from_slice(&[0u8; 65]).is_err());
        assert!(NodeId::from_slice(&[0u8; 64]).is_ok());
    }

    #[test]
    fn test_node_id_random_unique() {
        let a = NodeId::random();
        let b = NodeId::random();
        assert_ne!(a, b);
    }

    #[test]
    fn test_node_id_serde() {
        let id = NodeId::random();
        let json = serde_json::to_string(&id).unwrap();
        let restored: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn test_node_id_debug_truncated() {
        let id = NodeId::from_bytes([0xFFu8; NODE_ID_SIZE]);
        let debug = format!("{id:?}");
        assert!(debug.starts_with("NodeId(ffffffff"));
        assert!(debug.len() < 32);
    }
}
