// ============================================
// File: crates/palisade-transport/src/config.rs
// ============================================
//! # Transport Configuration
//!
//! ## Creation Reason
//! Provides configuration for connection setup and steady-state I/O:
//! deadlines for every blocking operation and the optional certificate
//! layer.
//!
//! ## Configuration Sections
//! - deadlines: handshake, per-frame read/write, disconnect grace
//! - `certificate`: local certificate bytes + shared verifier handle;
//!   presence of this section engages the certificate exchange
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every blocking I/O operation carries one of these deadlines; there
//!   is no separate cooperative-cancellation signal

use std::time::Duration;

use crate::cert::Verifier;
use crate::error::{Result, TransportError};

// ============================================
// Defaults
// ============================================

/// Total deadline for connection setup (both handshakes, both directions).
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for one steady-state frame read.
pub const DEFAULT_FRAME_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for one steady-state frame write.
pub const DEFAULT_FRAME_WRITE_TIMEOUT: Duration = Duration::from_secs(20);

/// Grace period for the best-effort disconnect notice. Short, because the
/// connection is already known to be going away.
pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_secs(1);

// ============================================
// CertificateConfig
// ============================================

/// Configuration of the optional certificate-binding layer.
#[derive(Debug, Clone)]
pub struct CertificateConfig {
    /// Local certificate transferred to peers.
    pub certificate: Vec<u8>,
    /// Shared verifier handle for peer certificates.
    pub verifier: Verifier,
}

impl CertificateConfig {
    /// Creates a certificate configuration.
    #[must_use]
    pub const fn new(certificate: Vec<u8>, verifier: Verifier) -> Self {
        Self {
            certificate,
            verifier,
        }
    }
}

// ============================================
// TransportConfig
// ============================================

/// Transport configuration.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use palisade_transport::config::TransportConfig;
///
/// let config = TransportConfig::new()
///     .with_handshake_timeout(Duration::from_secs(3))
///     .with_frame_read_timeout(Duration::from_secs(20));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Total deadline for connection setup.
    pub handshake_timeout: Duration,
    /// Deadline for one frame read after establishment.
    pub frame_read_timeout: Duration,
    /// Deadline for one frame write after establishment.
    pub frame_write_timeout: Duration,
    /// Grace period for the courtesy disconnect notice.
    pub disconnect_grace: Duration,
    /// Optional certificate layer; `None` disables the exchange.
    pub certificate: Option<CertificateConfig>,
}

impl TransportConfig {
    /// Creates a configuration with default deadlines and no certificate
    /// layer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            frame_read_timeout: DEFAULT_FRAME_READ_TIMEOUT,
            frame_write_timeout: DEFAULT_FRAME_WRITE_TIMEOUT,
            disconnect_grace: DEFAULT_DISCONNECT_GRACE,
            certificate: None,
        }
    }

    /// Sets the handshake deadline.
    #[must_use]
    pub const fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the frame read deadline.
    #[must_use]
    pub const fn with_frame_read_timeout(mut self, timeout: Duration) -> Self {
        self.frame_read_timeout = timeout;
        self
    }

    /// Sets the frame write deadline.
    #[must_use]
    pub const fn with_frame_write_timeout(mut self, timeout: Duration) -> Self {
        self.frame_write_timeout = timeout;
        self
    }

    /// Sets the disconnect grace period.
    #[must_use]
    pub const fn with_disconnect_grace(mut self, grace: Duration) -> Self {
        self.disconnect_grace = grace;
        self
    }

    /// Engages the certificate layer.
    #[must_use]
    pub fn with_certificate(mut self, certificate: CertificateConfig) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Certificate size advertised inside the signed handshake messages
    /// (0 = no certificate offered).
    #[must_use]
    pub fn advertised_cert_size(&self) -> u16 {
        self.certificate
            .as_ref()
            .map_or(0, |c| c.certificate.len() as u16)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if any field is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.handshake_timeout.is_zero() {
            return Err(TransportError::invalid_config(
                "handshake_timeout",
                "deadline cannot be zero",
            ));
        }
        if self.frame_read_timeout.is_zero() || self.frame_write_timeout.is_zero() {
            return Err(TransportError::invalid_config(
                "frame timeouts",
                "deadlines cannot be zero",
            ));
        }
        if let Some(cert) = &self.certificate {
            if cert.certificate.is_empty() {
                return Err(TransportError::invalid_config(
                    "certificate",
                    "certificate bytes cannot be empty",
                ));
            }
            if cert.certificate.len() > usize::from(u16::MAX) {
                return Err(TransportError::invalid_config(
                    "certificate",
                    "certificate exceeds the 16-bit size field",
                ));
            }
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Tests
// ============================================
