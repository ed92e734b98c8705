// ============================================
// File: crates/palisade-transport/src/cert.rs
// ============================================
//! # Certificate Exchange
//!
//! ## Creation Reason
//! Implements the optional certificate-binding layer: after the encryption
//! handshake proves a static key, both sides transfer their certificates
//! and bind the PKI identity to that exact key, defeating
//! certificate-substitution relays.
//!
//! ## Main Functionality
//! - `CertificateAuthority`: seam to the external PKI collaborator
//! - `Verifier`: explicitly constructed, cheaply clonable handle over a
//!   closed set of trust strategies
//! - Exchange drivers for both connection roles
//!
//! ## Exchange Order
//! The advertised cert-size fields inside the signed handshake messages
//! let both sides know in advance whether a transfer follows, so nobody
//! blocks reading while the peer blocks writing:
//! ```text
//! Initiator                              Responder
//!    │  ── own certificate ──────────►      │
//!    │                      read + validate │
//!    │  ◄────────────── own certificate ──  │
//!    │ read + validate                      │
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The embedded-key equality check runs even when authority
//!   verification passed; skipping it reopens the relay attack

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use sha3::{Digest, Keccak256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use palisade_core::crypto::PublicKey;

use crate::config::CertificateConfig;
use crate::error::{Result, TransportError};

// ============================================
// CertificateAuthority Seam
// ============================================

/// External PKI collaborator: parses certificates and verifies them
/// against the trusted authorities.
pub trait CertificateAuthority: Send + Sync {
    /// Verifies the certificate against the trusted authority set.
    ///
    /// # Errors
    /// Returns `CertificateInvalid` if verification fails.
    fn verify(&self, cert: &[u8]) -> Result<()>;

    /// Extracts the public key embedded in the certificate.
    ///
    /// # Errors
    /// Returns `CertificateInvalid` if the certificate cannot be parsed.
    fn embedded_key(&self, cert: &[u8]) -> Result<PublicKey>;
}

// ============================================
// Trust Strategies
// ============================================

/// Certificate fingerprint (Keccak-256 of the raw blob).
pub type Fingerprint = [u8; 32];

/// How peer certificates are validated. A closed set of strategies, fixed
/// when the [`Verifier`] is constructed.
pub enum TrustPolicy {
    /// Full authority-chain validation through the external collaborator.
    Authority(Arc<dyn CertificateAuthority>),
    /// Fingerprint pinning against an exact allow-list; key extraction
    /// still goes through the authority seam. For closed test networks.
    Pinned {
        /// Parser for embedded-key extraction.
        authority: Arc<dyn CertificateAuthority>,
        /// Allowed certificate fingerprints.
        fingerprints: HashSet<Fingerprint>,
    },
}

// ============================================
// Verifier
// ============================================

/// Shared certificate verifier handle.
///
/// Explicitly constructed and passed to every consumer; cloning shares
/// the underlying policy. There is intentionally no process-wide default
/// instance.
#[derive(Clone)]
pub struct Verifier {
    policy: Arc<TrustPolicy>,
}

impl Verifier {
    /// Creates a verifier performing full authority validation.
    #[must_use]
    pub fn authority(authority: Arc<dyn CertificateAuthority>) -> Self {
        Self {
            policy: Arc::new(TrustPolicy::Authority(authority)),
        }
    }

    /// Creates a verifier pinning an exact certificate allow-list.
    #[must_use]
    pub fn pinned(
        authority: Arc<dyn CertificateAuthority>,
        fingerprints: HashSet<Fingerprint>,
    ) -> Self {
        Self {
            policy: Arc::new(TrustPolicy::Pinned {
                authority,
                fingerprints,
            }),
        }
    }

    /// Keccak-256 fingerprint of a certificate blob.
    #[must_use]
    pub fn fingerprint(cert: &[u8]) -> Fingerprint {
        let mut hasher = Keccak256::new();
        hasher.update(cert);
        hasher.finalize().into()
    }

    /// Validates a certificate under the configured strategy.
    ///
    /// # Errors
    /// Returns `CertificateInvalid` if validation fails.
    pub fn verify(&self, cert: &[u8]) -> Result<()> {
        match &*self.policy {
            TrustPolicy::Authority(authority) => authority.verify(cert),
            TrustPolicy::Pinned { fingerprints, .. } => {
                if fingerprints.contains(&Self::fingerprint(cert)) {
                    Ok(())
                } else {
                    Err(TransportError::certificate_invalid(
                        "certificate fingerprint is not pinned",
                    ))
                }
            }
        }
    }

    /// Extracts the public key embedded in a certificate.
    ///
    /// # Errors
    /// Returns `CertificateInvalid` if the certificate cannot be parsed.
    pub fn embedded_key(&self, cert: &[u8]) -> Result<PublicKey> {
        match &*self.policy {
            TrustPolicy::Authority(authority) | TrustPolicy::Pinned { authority, .. } => {
                authority.embedded_key(cert)
            }
        }
    }

    /// Full peer-certificate validation: strategy check, key extraction
    /// and the binding against the handshake-proven static key.
    ///
    /// # Errors
    /// - `CertificateInvalid` if validation or parsing fails
    /// - `CertificateIdentityMismatch` if the embedded key differs from
    ///   `expected`, even though validation passed
    pub fn validate_peer(&self, cert: &[u8], expected: &PublicKey) -> Result<()> {
        self.verify(cert)?;
        let embedded = self.embedded_key(cert)?;
        if embedded != *expected {
            return Err(TransportError::CertificateIdentityMismatch);
        }
        Ok(())
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy = match &*self.policy {
            TrustPolicy::Authority(_) => "Authority",
            TrustPolicy::Pinned { fingerprints, .. } => {
                return write!(f, "Verifier(Pinned, {} fingerprints)", fingerprints.len())
            }
        };
        write!(f, "Verifier({policy})")
    }
}

// ============================================
// Exchange Drivers
// ============================================

/// Checks the peer's advertised certificate size against the local
/// configuration before any certificate byte moves.
///
/// # Errors
/// - `CertificateMissing` if the peer advertised 0
/// - `CertificateSizeMismatch` if the advertised size differs from the
///   local certificate's length
pub(crate) fn check_advertisement(advertised: u16, config: &CertificateConfig) -> Result<()> {
    if advertised == 0 {
        return Err(TransportError::CertificateMissing);
    }
    if usize::from(advertised) != config.certificate.len() {
        return Err(TransportError::CertificateSizeMismatch {
            advertised,
            local: config.certificate.len(),
        });
    }
    Ok(())
}

/// Initiator side: write own certificate, then read and validate the
/// peer's.
pub(crate) async fn exchange_as_initiator<S>(
    stream: &mut S,
    config: &CertificateConfig,
    advertised: u16,
    remote: &PublicKey,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&config.certificate).await?;
    read_and_validate(stream, config, advertised, remote).await
}

/// Responder side: read and validate the peer's certificate, then write
/// our own.
pub(crate) async fn exchange_as_responder<S>(
    stream: &mut S,
    config: &CertificateConfig,
    advertised: u16,
    remote: &PublicKey,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    read_and_validate(stream, config, advertised, remote).await?;
    stream.write_all(&config.certificate).await?;
    Ok(())
}

async fn read_and_validate<S>(
    stream: &mut S,
    config: &CertificateConfig,
    advertised: u16,
    remote: &PublicKey,
) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let mut cert = vec![0u8; usize::from(advertised)];
    stream.read_exact(&mut cert).await?;
    config.verifier.validate_peer(&cert, remote)?;
    debug!(remote = %remote, "peer certificate bound to handshake identity");
    Ok(())
}

// ============================================
// Test Fixtures
// ============================================

/// Toy certificate format shared by the transport tests:
/// `issuer tag (4) ‖ embedded key (64)`.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use palisade_core::crypto::StaticKeyPair;

    pub(crate) const ISSUER_TAG: &[u8; 4] = b"PALI";

    /// Authority accepting any certificate carrying the trusted issuer tag.
    pub(crate) struct StubAuthority;

    impl CertificateAuthority for StubAuthority {
        fn verify(&self, cert: &[u8]) -> Result<()> {
            if cert.len() == 68 && &cert[..4] == ISSUER_TAG {
                Ok(())
            } else {
                Err(TransportError::certificate_invalid("untrusted issuer"))
            }
        }

        fn embedded_key(&self, cert: &[u8]) -> Result<PublicKey> {
            if cert.len() != 68 {
                return Err(TransportError::certificate_invalid("bad length"));
            }
            PublicKey::from_uncompressed(&cert[4..])
                .map_err(|_| TransportError::certificate_invalid("bad embedded key"))
        }
    }

    /// Issues a toy certificate embedding the given identity.
    pub(crate) fn issue(identity: &StaticKeyPair) -> Vec<u8> {
        let mut cert = Vec::with_capacity(68);
        cert.extend_from_slice(ISSUER_TAG);
        cert.extend_from_slice(&identity.public_key().to_uncompressed());
        cert
    }
}

// ============================================
// Tests
// ============================================
