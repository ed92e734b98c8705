// ============================================
// File: crates/palisade-core/src/crypto/suite.rs
// ============================================
//! # Primitive Suite Helpers
//!
//! ## Creation Reason
//! Groups the hashing and envelope operations the handshake engine builds
//! on, so the engine itself stays free of primitive plumbing.
//!
//! ## Main Functionality
//! - `keccak256`: Keccak-256 over concatenated inputs
//! - `xor32`: fixed-width XOR used for the signed handshake digest and the
//!   MAC seed material
//! - `seal` / `open`: the asymmetric envelope around the two pre-frame
//!   handshake messages (ECIES to the recipient's static key)
//!
//! ## ⚠️ Important Note for Next Developer
//! - The envelope has a constant size overhead (`ENVELOPE_OVERHEAD`);
//!   both sides read exact ciphertext lengths, so any change to the
//!   envelope construction is a wire-breaking change

use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

use super::{keys::PublicKey, keys::StaticKeyPair, DIGEST_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// Hashing
// ============================================

/// Computes Keccak-256 over the concatenation of the given parts.
#[must_use]
pub fn keccak256(parts: &[&[u8]]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// XORs two 32-byte values.
#[must_use]
pub fn xor32(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a[i] ^ b[i];
    }
    out
}

// ============================================
// Handshake Envelope
// ============================================

/// Seals a handshake message to the recipient's static public key.
///
/// # Errors
/// Returns `EncryptionFailure` if the envelope cannot be constructed.
pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    ecies::encrypt(&recipient.to_sec1_bytes(), plaintext).map_err(|_| {
        CoreError::EncryptionFailure {
            context: "handshake envelope".into(),
        }
    })
}

/// Opens a handshake envelope with the local static private key.
///
/// # Errors
/// Returns `DecryptionFailure` if the ciphertext does not open - wrong
/// recipient, truncation or tampering are indistinguishable by design.
pub fn open(local: &StaticKeyPair, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut secret = local.to_bytes();
    let result = ecies::decrypt(&secret, ciphertext);
    secret.zeroize();
    result.map_err(|_| CoreError::DecryptionFailure)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ENVELOPE_OVERHEAD;

    #[test]
    fn test_keccak256_empty_vector() {
        // Known Keccak-256 digest of the empty string
        let digest = keccak256(&[]);
        assert_eq!(
            hex::encode(digest),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_concatenation() {
        // Hashing parts is identical to hashing their concatenation
        assert_eq!(keccak256(&[b"ab", b"cd"]), keccak256(&[b"abcd"]));
        assert_ne!(keccak256(&[b"ab"]), keccak256(&[b"cd"]));
    }

    #[test]
    fn test_xor32_involution() {
        let a = [0x5Au8; 32];
        let b = [0xA5u8; 32];
        let x = xor32(&a, &b);
        assert_eq!(x, [0xFFu8; 32]);
        assert_eq!(xor32(&x, &b), a);
    }

    #[test]
    fn test_envelope_roundtrip() {
        let recipient = StaticKeyPair::generate();
        let plaintext = b"sealed handshake message";

        let ciphertext = seal(&recipient.public_key(), plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + ENVELOPE_OVERHEAD);

        let opened = open(&recipient, &ciphertext).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_envelope_wrong_recipient_fails() {
        let recipient = StaticKeyPair::generate();
        let other = StaticKeyPair::generate();

        let ciphertext = seal(&recipient.public_key(), b"for recipient only").unwrap();
        assert!(matches!(
            open(&other, &ciphertext),
            Err(CoreError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_envelope_tamper_fails() {
        let recipient = StaticKeyPair::generate();
        let mut ciphertext = seal(&recipient.public_key(), b"integrity protected").unwrap();

        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        assert!(matches!(
            open(&recipient, &ciphertext),
            Err(CoreError::DecryptionFailure)
        ));
    }
}
