// ============================================
// File: crates/palisade-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for connection setup, the certificate exchange and
//! steady-state frame I/O.
//!
//! ## Error Categories
//! 1. **Certificate Errors**: Missing, mis-sized, invalid or mis-bound
//!    certificates during the optional exchange
//! 2. **Connection Errors**: Deadlines, disconnect notices, state misuse
//! 3. **Wrapped Errors**: Core protocol and raw I/O failures
//!
//! ## ⚠️ Important Note for Next Developer
//! - Callers must treat `Timeout` exactly like any protocol failure: the
//!   connection is fatal either way and is never repaired in place

use std::io;

use thiserror::Error;

use palisade_core::error::CoreError;
use palisade_core::protocol::DisconnectReason;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Certificate Errors
    // ========================================

    /// We expect a certificate but the peer advertised none.
    #[error("Peer offered no certificate")]
    CertificateMissing,

    /// The advertised certificate size does not match the local one.
    #[error("Certificate size mismatch: advertised {advertised}, local {local}")]
    CertificateSizeMismatch {
        /// Size the peer advertised in its signed handshake message
        advertised: u16,
        /// Length of the locally configured certificate
        local: usize,
    },

    /// Authority verification of the peer certificate failed.
    #[error("Certificate invalid: {reason}")]
    CertificateInvalid {
        /// Why verification failed
        reason: String,
    },

    /// The certificate's embedded key is not the handshake-proven key.
    ///
    /// Raised even when authority verification passed - this is the
    /// binding that defeats certificate-substitution relays.
    #[error("Certificate does not match the handshake identity")]
    CertificateIdentityMismatch,

    // ========================================
    // Connection Errors
    // ========================================

    /// A deadline expired.
    #[error("Timed out during {operation}")]
    Timeout {
        /// What operation was in flight
        operation: &'static str,
    },

    /// The peer sent a disconnect notice, or a protocol verdict closed
    /// the connection with an accountable reason.
    #[error("Disconnected: {0}")]
    Disconnected(DisconnectReason),

    /// Operation attempted on a closed connection.
    #[error("Connection is closed")]
    Closed,

    /// The first frame was not a capability hello.
    #[error("Expected capability hello, got frame 0x{tag:02x}")]
    UnexpectedFrame {
        /// Tag of the offending frame
        tag: u8,
    },

    /// Invalid configuration.
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig {
        /// Configuration field at fault
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Protocol or crypto failure from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Raw I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Creates a `CertificateInvalid` error.
    pub fn certificate_invalid(reason: impl Into<String>) -> Self {
        Self::CertificateInvalid {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidConfig` error.
    pub const fn invalid_config(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidConfig { field, reason }
    }

    /// Returns `true` for failures of the optional certificate layer.
    #[must_use]
    pub const fn is_certificate_error(&self) -> bool {
        matches!(
            self,
            Self::CertificateMissing
                | Self::CertificateSizeMismatch { .. }
                | Self::CertificateInvalid { .. }
                | Self::CertificateIdentityMismatch
        )
    }

    /// Returns the peer-accountable disconnect reason, if any.
    #[must_use]
    pub const fn disconnect_reason(&self) -> Option<DisconnectReason> {
        match self {
            Self::Disconnected(reason) => Some(*reason),
            _ => None,
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
    fn test_error_display() {
        let err = TransportError::CertificateSizeMismatch {
            advertised: 100,
            local: 120,
        };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("120"));

        let err = TransportError::Disconnected(DisconnectReason::TooManyPeers);
        assert!(err.to_string().contains("too many peers"));
    }

    #[test]
    fn test_certificate_classification() {
        assert!(TransportError::CertificateMissing.is_certificate_error());
        assert!(TransportError::CertificateIdentityMismatch.is_certificate_error());
        assert!(!TransportError::Closed.is_certificate_error());
    }

    #[test]
    fn test_disconnect_reason_extraction() {
        let err = TransportError::Disconnected(DisconnectReason::UselessPeer);
        assert_eq!(err.disconnect_reason(), Some(DisconnectReason::UselessPeer));
        assert_eq!(
            TransportError::Timeout { operation: "read" }.disconnect_reason(),
            None
        );
    }

    #[test]
    fn test_core_error_conversion() {
        let core = CoreError::DecryptionFailure;
        let transport: TransportError = core.into();
        assert!(matches!(transport, TransportError::Core(_)));
    }
}
