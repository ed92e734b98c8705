// ============================================
// File: crates/palisade-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the key types used by the handshake with proper security
//! properties (no private material in `Debug`, single-purpose types).
//!
//! ## Main Functionality
//! - `StaticKeyPair`: Long-term secp256k1 identity keys
//! - `EphemeralKeyPair`: Per-handshake keys for signing and ECDH
//! - `PublicKey`: 64-byte uncompressed wire representation
//! - `recover_public_key`: ECDSA public-key recovery
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  StaticKeyPair (long-term)                             │
//! │  ├─ Identifies the node across the network             │
//! │  ├─ Runs the static-static ECDH inside the handshake   │
//! │  └─ Opens the asymmetric handshake envelope            │
//! │                                                        │
//! │  EphemeralKeyPair (per handshake attempt)              │
//! │  ├─ Signs the handshake digest (peer recovers it)      │
//! │  ├─ Runs the ephemeral-ephemeral ECDH                  │
//! │  └─ Discarded once Secrets are derived                 │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Private keys must NEVER appear in logs or serialized output
//! - Ephemeral keys are single-handshake-use; never cache them

use std::fmt;

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use palisade_common::types::NodeId;

use super::{DIGEST_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// PublicKey
// ============================================

/// A secp256k1 public key with the protocol's 64-byte wire representation
/// (uncompressed point without the `0x04` format byte).
#[derive(Clone)]
pub struct PublicKey(VerifyingKey);

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_uncompressed() == other.to_uncompressed()
    }
}

impl Eq for PublicKey {}

impl PublicKey {
    /// Imports a public key from its wire representation.
    ///
    /// Accepts 64 bytes (format byte stripped) or 65 bytes (full
    /// uncompressed SEC1 encoding).
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the bytes are not a valid curve point.
    pub fn from_uncompressed(bytes: &[u8]) -> Result<Self> {
        let mut sec1 = [0u8; PUBLIC_KEY_SIZE + 1];
        match bytes.len() {
            PUBLIC_KEY_SIZE => {
                sec1[0] = 0x04;
                sec1[1..].copy_from_slice(bytes);
            }
            65 => sec1.copy_from_slice(bytes),
            n => {
                return Err(CoreError::key_generation(format!(
                    "invalid public key length {n} (expect 64/65)"
                )))
            }
        }
        let key = VerifyingKey::from_sec1_bytes(&sec1)
            .map_err(|_| CoreError::key_generation("invalid secp256k1 public key"))?;
        Ok(Self(key))
    }

    /// Returns the 64-byte wire representation.
    #[must_use]
    pub fn to_uncompressed(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; PUBLIC_KEY_SIZE];
        out.copy_from_slice(&point.as_bytes()[1..]);
        out
    }

    /// Returns the full 65-byte SEC1 encoding (for the envelope layer).
    #[must_use]
    pub fn to_sec1_bytes(&self) -> [u8; PUBLIC_KEY_SIZE + 1] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; PUBLIC_KEY_SIZE + 1];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Returns the node identifier derived from this key.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        NodeId::from_bytes(self.to_uncompressed())
    }

    /// Verifies a recoverable signature against this key over a
    /// 32-byte digest.
    ///
    /// # Errors
    /// Returns `SignatureRecovery` if the signature is structurally
    /// invalid or does not verify.
    pub fn verify_prehash(&self, digest: &[u8; DIGEST_SIZE], sig: &[u8; SIGNATURE_SIZE]) -> Result<()> {
        let signature =
            Signature::from_slice(&sig[..64]).map_err(|_| CoreError::SignatureRecovery)?;
        self.0
            .verify_prehash(digest, &signature)
            .map_err(|_| CoreError::SignatureRecovery)
    }

    pub(crate) const fn inner(&self) -> &VerifyingKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_uncompressed();
        write!(
            f,
            "PublicKey({:02x}{:02x}{:02x}{:02x}…)",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_uncompressed()))
    }
}

// ============================================
// StaticKeyPair
// ============================================

/// Long-term secp256k1 identity key pair.
///
/// # Security
/// - Never serialize the private key to untrusted storage
/// - Generate using the OS random number generator
pub struct StaticKeyPair {
    signing: SigningKey,
}

impl StaticKeyPair {
    /// Generates a new random identity key pair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::random(&mut OsRng),
        }
    }

    /// Creates an identity from raw private key bytes.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the bytes are not a valid scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let signing = SigningKey::from_slice(bytes)
            .map_err(|_| CoreError::key_generation("invalid secp256k1 private key"))?;
        Ok(Self { signing })
    }

    /// Exports the private key bytes for secure storage.
    ///
    /// # Security Warning
    /// Handle the returned bytes with extreme care; zeroize after use.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing.to_bytes().into()
    }

    /// Returns the public key component.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().clone())
    }

    /// Static-static Diffie-Hellman with a peer's public key.
    ///
    /// Returns the x-coordinate of the shared point.
    #[must_use]
    pub fn ecdh(&self, peer: &PublicKey) -> [u8; 32] {
        let shared =
            k256::ecdh::diffie_hellman(self.signing.as_nonzero_scalar(), peer.inner().as_affine());
        let mut out = [0u8; 32];
        out.copy_from_slice(shared.raw_secret_bytes());
        out
    }
}

impl fmt::Debug for StaticKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private key material
        f.debug_struct("StaticKeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

// ============================================
// EphemeralKeyPair
// ============================================

/// Ephemeral secp256k1 key pair, generated fresh per handshake attempt.
///
/// Signs the handshake digest (the peer recovers this key from the
/// signature) and runs the ephemeral-ephemeral key agreement that gives
/// the connection forward secrecy.
pub struct EphemeralKeyPair {
    signing: SigningKey,
}

impl EphemeralKeyPair {
    /// Generates a new random ephemeral key pair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::random(&mut OsRng),
        }
    }

    /// Returns the public key component.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().clone())
    }

    /// Signs a 32-byte digest, producing a recoverable signature.
    ///
    /// # Errors
    /// Returns `SignatureCreation` if signing fails.
    pub fn sign_recoverable(&self, digest: &[u8; DIGEST_SIZE]) -> Result<[u8; SIGNATURE_SIZE]> {
        let (signature, recovery) = self
            .signing
            .sign_prehash_recoverable(digest)
            .map_err(|e| CoreError::SignatureCreation {
                reason: e.to_string(),
            })?;
        let mut out = [0u8; SIGNATURE_SIZE];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery.to_byte();
        Ok(out)
    }

    /// Ephemeral-ephemeral Diffie-Hellman with the peer's ephemeral key.
    ///
    /// Returns the x-coordinate of the shared point.
    #[must_use]
    pub fn ecdh(&self, peer: &PublicKey) -> [u8; 32] {
        let shared =
            k256::ecdh::diffie_hellman(self.signing.as_nonzero_scalar(), peer.inner().as_affine());
        let mut out = [0u8; 32];
        out.copy_from_slice(shared.raw_secret_bytes());
        out
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

// ============================================
// Public-Key Recovery
// ============================================

/// Recovers the signer's public key from a recoverable signature over a
/// 32-byte digest.
///
/// # Errors
/// Returns `SignatureRecovery` if the signature is structurally invalid or
/// no usable key can be recovered.
pub fn recover_public_key(
    digest: &[u8; DIGEST_SIZE],
    sig: &[u8; SIGNATURE_SIZE],
) -> Result<PublicKey> {
    let signature = Signature::from_slice(&sig[..64]).map_err(|_| CoreError::SignatureRecovery)?;
    let recovery = RecoveryId::from_byte(sig[64]).ok_or(CoreError::SignatureRecovery)?;
    let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery)
        .map_err(|_| CoreError::SignatureRecovery)?;
    Ok(PublicKey(key))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_keypair_roundtrip() {
        let kp = StaticKeyPair::generate();
        let restored = StaticKeyPair::from_bytes(&kp.to_bytes()).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn test_public_key_wire_roundtrip() {
        let kp = StaticKeyPair::generate();
        let public = kp.public_key();

        let wire64 = public.to_uncompressed();
        assert_eq!(public, PublicKey::from_uncompressed(&wire64).unwrap());

        let wire65 = public.to_sec1_bytes();
        assert_eq!(wire65[0], 0x04);
        assert_eq!(public, PublicKey::from_uncompressed(&wire65).unwrap());

        assert!(PublicKey::from_uncompressed(&[0u8; 12]).is_err());
    }

    #[test]
    fn test_sign_and_recover() {
        let ephemeral = EphemeralKeyPair::generate();
        let digest = [0x42u8; DIGEST_SIZE];

        let sig = ephemeral.sign_recoverable(&digest).unwrap();
        let recovered = recover_public_key(&digest, &sig).unwrap();

        assert_eq!(recovered, ephemeral.public_key());
        assert!(recovered.verify_prehash(&digest, &sig).is_ok());
    }

    #[test]
    fn test_recover_rejects_corrupted_signature() {
        let ephemeral = EphemeralKeyPair::generate();
        let digest = [0x42u8; DIGEST_SIZE];
        let mut sig = ephemeral.sign_recoverable(&digest).unwrap();

        // An out-of-range recovery id never resolves to a key
        sig[64] = 0xFF;
        assert!(matches!(
            recover_public_key(&digest, &sig),
            Err(CoreError::SignatureRecovery)
        ));
    }

    #[test]
    fn test_recover_wrong_digest_gives_wrong_key() {
        let ephemeral = EphemeralKeyPair::generate();
        let digest = [0x42u8; DIGEST_SIZE];
        let sig = ephemeral.sign_recoverable(&digest).unwrap();

        let other = [0x43u8; DIGEST_SIZE];
        if let Ok(recovered) = recover_public_key(&other, &sig) {
            assert_ne!(recovered, ephemeral.public_key());
        }
    }

    #[test]
    fn test_ecdh_agreement() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();

        assert_eq!(a.ecdh(&b.public_key()), b.ecdh(&a.public_key()));

        let c = StaticKeyPair::generate();
        assert_ne!(a.ecdh(&b.public_key()), a.ecdh(&c.public_key()));
    }

    #[test]
    fn test_ephemeral_ecdh_agreement() {
        let a = EphemeralKeyPair::generate();
        let b = EphemeralKeyPair::generate();
        assert_eq!(a.ecdh(&b.public_key()), b.ecdh(&a.public_key()));
    }

    #[test]
    fn test_debug_redacts_private_material() {
        let kp = StaticKeyPair::generate();
        let debug = format!("{kp:?}");
        assert!(!debug.contains(&hex::encode(kp.to_bytes())));
    }
}
