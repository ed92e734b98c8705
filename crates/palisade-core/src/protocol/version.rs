// ============================================
// File: crates/palisade-core/src/protocol/version.rs
// ============================================
//! # Capability Protocol Versioning
//!
//! ## Creation Reason
//! Manages the capability-protocol version carried in the hello frame.
//! Unlike the handshake version (a strict equality gate), this version is
//! a feature threshold: compression turns on when the peer's advertised
//! version is recent enough.
//!
//! ## Version History
//! | Version | Description |
//! |---------|-------------|
//! | 0x01    | Initial capability protocol |
//! | 0x02    | Snappy frame compression |

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================
// Constants
// ============================================

/// Current capability protocol version.
pub const CURRENT_PROTOCOL_VERSION: u8 = 0x02;

/// Lowest peer version for which frame compression is enabled.
pub const MIN_COMPRESSION_VERSION: u8 = 0x02;

// ============================================
// ProtocolVersion
// ============================================

/// Capability protocol version identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(u8);

impl ProtocolVersion {
    /// Creates a new protocol version.
    #[must_use]
    pub const fn new(version: u8) -> Self {
        Self(version)
    }

    /// Returns the current protocol version.
    #[must_use]
    pub const fn current() -> Self {
        Self(CURRENT_PROTOCOL_VERSION)
    }

    /// Returns the raw version number.
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Whether a peer advertising this version gets frame compression.
    ///
    /// Decided once per connection, immediately after the capability
    /// handshake, and immutable thereafter.
    #[must_use]
    pub const fn supports_compression(&self) -> bool {
        self.0 >= MIN_COMPRESSION_VERSION
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u8> for ProtocolVersion {
    fn from(version: u8) -> Self {
        Self(version)
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> Self {
        version.0
    }
}

// ============================================
// Tests
// ============================================
