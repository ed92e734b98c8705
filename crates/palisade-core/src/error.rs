// ============================================
// File: crates/palisade-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types for the handshake engine, frame codec and
//! capability protocol.
//!
//! ## Error Categories
//! 1. **Crypto Errors**: Key generation, signing, envelope failures
//! 2. **Protocol Errors**: Malformed messages, version gate, frame limits
//! 3. **Integrity Errors**: MAC mismatches - always fatal, never retried
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - MAC and decryption failures indicate corruption or active tampering;
//!   the session must be discarded, not retried

use thiserror::Error;

use palisade_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for handshake and framing operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Failed to generate or import cryptographic key.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What key was being generated
        context: String,
    },

    /// Signature creation failed.
    #[error("Failed to create signature: {reason}")]
    SignatureCreation {
        /// Why signing failed
        reason: String,
    },

    /// The embedded signature did not recover a usable public key.
    #[error("Signature recovery failed")]
    SignatureRecovery,

    /// Sealing a handshake message into its envelope failed.
    #[error("Envelope encryption failed: {context}")]
    EncryptionFailure {
        /// What was being sealed
        context: String,
    },

    /// Opening a handshake envelope failed (wrong key or tampering).
    #[error("Envelope decryption failed")]
    DecryptionFailure,

    // ========================================
    // Protocol Errors
    // ========================================

    /// Message is malformed or structurally invalid.
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What's wrong with the message
        reason: String,
    },

    /// Message is too short to be valid.
    #[error("Message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// Handshake version fields are not bit-identical.
    #[error("Version mismatch: local {local}, remote {remote}")]
    VersionMismatch {
        /// Version this side speaks
        local: u32,
        /// Version the peer advertised
        remote: u32,
    },

    /// Frame payload exceeds the 24-bit size cap.
    #[error("Frame too large: {size} bytes exceeds {max}")]
    FrameTooLarge {
        /// Offending size
        size: usize,
        /// Maximum allowed payload size
        max: usize,
    },

    /// A frame MAC did not verify.
    #[error("Bad {segment} MAC")]
    MacMismatch {
        /// Which MAC failed ("header" or "frame")
        segment: &'static str,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O failure while reading or writing a frame.
    #[error("I/O error during {context}")]
    Io {
        /// What operation was being performed
        context: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates a `MalformedMessage` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Creates a `MessageTooShort` error.
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration { .. }
                | Self::SignatureCreation { .. }
                | Self::SignatureRecovery
                | Self::EncryptionFailure { .. }
                | Self::DecryptionFailure
                | Self::MacMismatch { .. }
        )
    }

    /// Returns `true` if this error might indicate an attack.
    ///
    /// These errors warrant additional logging/monitoring, and policy for
    /// all of them is unconditional connection termination.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::SignatureRecovery | Self::DecryptionFailure | Self::MacMismatch { .. }
        )
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
        let err = CoreError::MacMismatch { segment: "header" };
        assert_eq!(err.to_string(), "Bad header MAC");

        let err = CoreError::VersionMismatch {
            local: 1,
            remote: 2,
        };
        assert!(err.to_string().contains('1'));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::DecryptionFailure.is_crypto_error());
        assert!(CoreError::DecryptionFailure.is_suspicious());

        assert!(CoreError::MacMismatch { segment: "frame" }.is_suspicious());

        let too_large = CoreError::FrameTooLarge {
            size: 1 << 24,
            max: (1 << 24) - 1,
        };
        assert!(!too_large.is_crypto_error());
        assert!(!too_large.is_suspicious());
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_length(64, 12);
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
    }
}
