// ============================================
// File: crates/palisade-core/src/handshake.rs
// ============================================
//! # Encryption Handshake Engine
//!
//! ## Creation Reason
//! Implements the authenticated key exchange that bootstraps every
//! connection: two sealed messages, public-key recovery instead of a
//! transmitted ephemeral key on the initiator side, and a Keccak-256
//! derivation chain producing the per-connection secrets.
//!
//! ## Handshake Flow
//! ```text
//! Initiator                                          Responder
//!   │                                                    │
//!   │  auth = seal{ sig(eph, secret^nonce),              │
//!   │              static key, nonce, version, certlen } │
//!   │  ──────────────────────────────────────────────►   │
//!   │                                                    │
//!   │                   open, recover ephemeral from sig │
//!   │                   generate own nonce + ephemeral   │
//!   │                                                    │
//!   │         ack = seal{ ephemeral key, nonce,          │
//!   │  ◄───────────────── version, certlen }             │
//!   │                                                    │
//!   │   both: ephemeral ECDH → Keccak chain → Secrets    │
//! ```
//!
//! ## Role Asymmetry
//! The single place where directional bookkeeping differs between the two
//! sides - which freshly seeded MAC state becomes egress versus ingress -
//! lives behind the [`HandshakeRole`] strategies [`Initiator`] and
//! [`Responder`]. Nothing else in the crate branches on the role.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The MAC states are seeded over the sealed ciphertexts exactly as
//!   transmitted; reordering any absorb call breaks wire compatibility
//! - Version equality is a strict gate - there is deliberately no
//!   negotiation range

use std::fmt;
use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use rand::RngCore;
use tracing::{debug, trace};
use zeroize::Zeroize;

use crate::crypto::{
    keccak256, open, recover_public_key, seal, xor32, EphemeralKeyPair, PublicKey, StaticKeyPair,
    AES_KEY_SIZE, ENVELOPE_OVERHEAD, MAC_KEY_SIZE, NONCE_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};
use crate::error::{CoreError, Result};
use crate::framing::MacState;

// ============================================
// Constants
// ============================================

/// Handshake wire version. Both sides must advertise the exact same value;
/// there is no compatibility range.
pub const HANDSHAKE_VERSION: u32 = 1;

/// Plaintext size of the initiator's auth message
/// (`cert_size(2) ‖ signature ‖ static key ‖ nonce ‖ version(4)`).
pub const AUTH_MSG_LEN: usize = 2 + SIGNATURE_SIZE + PUBLIC_KEY_SIZE + NONCE_SIZE + 4;

/// Plaintext size of the responder's ack
/// (`cert_size(2) ‖ ephemeral key ‖ nonce ‖ version(4)`).
pub const AUTH_ACK_LEN: usize = 2 + PUBLIC_KEY_SIZE + NONCE_SIZE + 4;

/// On-wire size of the sealed auth message.
pub const SEALED_AUTH_MSG_LEN: usize = AUTH_MSG_LEN + ENVELOPE_OVERHEAD;

/// On-wire size of the sealed ack.
pub const SEALED_AUTH_ACK_LEN: usize = AUTH_ACK_LEN + ENVELOPE_OVERHEAD;

// ============================================
// Handshake Messages
// ============================================

/// Initiator's handshake message (decrypted form).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMsg {
    /// Recoverable signature by the initiator's ephemeral key over
    /// `XOR(staticSecret, nonce)`.
    pub signature: [u8; SIGNATURE_SIZE],
    /// Initiator's static public key (wire form).
    pub static_pubkey: [u8; PUBLIC_KEY_SIZE],
    /// Initiator's nonce.
    pub nonce: [u8; NONCE_SIZE],
    /// Handshake version (strict equality gate).
    pub version: u32,
    /// Size of the certificate the initiator will transfer (0 = none).
    pub cert_size: u16,
}

impl AuthMsg {
    /// Encodes the message into its fixed plaintext layout.
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(AUTH_MSG_LEN);
        buf.put_u16(self.cert_size);
        buf.put_slice(&self.signature);
        buf.put_slice(&self.static_pubkey);
        buf.put_slice(&self.nonce);
        buf.put_u32(self.version);
        buf
    }

    /// Decodes a message from its fixed plaintext layout.
    ///
    /// # Errors
    /// Returns `MessageTooShort` / `MalformedMessage` on any length
    /// deviation - the layout is fixed, so there is never trailing data.
    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < AUTH_MSG_LEN {
            return Err(CoreError::too_short(AUTH_MSG_LEN, buf.len()));
        }
        if buf.len() > AUTH_MSG_LEN {
            return Err(CoreError::malformed("trailing bytes after auth message"));
        }

        let cert_size = buf.get_u16();
        let mut signature = [0u8; SIGNATURE_SIZE];
        buf.copy_to_slice(&mut signature);
        let mut static_pubkey = [0u8; PUBLIC_KEY_SIZE];
        buf.copy_to_slice(&mut static_pubkey);
        let mut nonce = [0u8; NONCE_SIZE];
        buf.copy_to_slice(&mut nonce);
        let version = buf.get_u32();

        Ok(Self {
            signature,
            static_pubkey,
            nonce,
            version,
            cert_size,
        })
    }
}

/// Responder's handshake ack (decrypted form).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthAck {
    /// Responder's ephemeral public key (wire form).
    pub ephemeral_pubkey: [u8; PUBLIC_KEY_SIZE],
    /// Responder's nonce.
    pub nonce: [u8; NONCE_SIZE],
    /// Handshake version (strict equality gate).
    pub version: u32,
    /// Size of the certificate the responder will transfer (0 = none).
    pub cert_size: u16,
}

impl AuthAck {
    /// Encodes the ack into its fixed plaintext layout.
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(AUTH_ACK_LEN);
        buf.put_u16(self.cert_size);
        buf.put_slice(&self.ephemeral_pubkey);
        buf.put_slice(&self.nonce);
        buf.put_u32(self.version);
        buf
    }

    /// Decodes an ack from its fixed plaintext layout.
    ///
    /// # Errors
    /// Returns `MessageTooShort` / `MalformedMessage` on length deviation.
    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < AUTH_ACK_LEN {
            return Err(CoreError::too_short(AUTH_ACK_LEN, buf.len()));
        }
        if buf.len() > AUTH_ACK_LEN {
            return Err(CoreError::malformed("trailing bytes after auth ack"));
        }

        let cert_size = buf.get_u16();
        let mut ephemeral_pubkey = [0u8; PUBLIC_KEY_SIZE];
        buf.copy_to_slice(&mut ephemeral_pubkey);
        let mut nonce = [0u8; NONCE_SIZE];
        buf.copy_to_slice(&mut nonce);
        let version = buf.get_u32();

        Ok(Self {
            ephemeral_pubkey,
            nonce,
            version,
            cert_size,
        })
    }
}

// ============================================
// Role Strategies
// ============================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Initiator {}
    impl Sealed for super::Responder {}
}

/// One side of the handshake role asymmetry.
///
/// Exactly two implementations exist ([`Initiator`] and [`Responder`]);
/// the trait is sealed so the set stays closed.
pub trait HandshakeRole: sealed::Sealed {
    /// `true` on the dialing side.
    const INITIATOR: bool;

    /// Assigns the two freshly seeded MAC states to wire directions.
    ///
    /// `mac_auth` was seeded with `XOR(macKey, respNonce)` plus the sealed
    /// auth message; `mac_ack` with `XOR(macKey, initNonce)` plus the
    /// sealed ack. The initiator transmits the auth message, so `mac_auth`
    /// is its egress chain; the responder sees it mirrored.
    fn assign_macs(mac_auth: MacState, mac_ack: MacState) -> (MacState, MacState);
}

/// Dialing-side role strategy.
#[derive(Debug, Clone, Copy)]
pub struct Initiator;

/// Listening-side role strategy.
#[derive(Debug, Clone, Copy)]
pub struct Responder;

impl HandshakeRole for Initiator {
    const INITIATOR: bool = true;

    fn assign_macs(mac_auth: MacState, mac_ack: MacState) -> (MacState, MacState) {
        (mac_auth, mac_ack)
    }
}

impl HandshakeRole for Responder {
    const INITIATOR: bool = false;

    fn assign_macs(mac_auth: MacState, mac_ack: MacState) -> (MacState, MacState) {
        (mac_ack, mac_auth)
    }
}

// ============================================
// Secrets
// ============================================

/// Connection secrets negotiated by the handshake.
///
/// Derived exactly once per connection and immutable thereafter. The AES
/// and MAC keys are zeroized on drop.
pub struct Secrets {
    /// Peer's static public key as proven by the handshake.
    pub remote: PublicKey,
    /// AES session key for the frame stream cipher.
    pub aes: [u8; AES_KEY_SIZE],
    /// Key for the MAC whitening cipher.
    pub mac: [u8; MAC_KEY_SIZE],
    /// MAC chain for frames this side sends.
    pub egress_mac: MacState,
    /// MAC chain for frames this side receives.
    pub ingress_mac: MacState,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        f.debug_struct("Secrets")
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

impl Drop for Secrets {
    fn drop(&mut self) {
        self.aes.zeroize();
        self.mac.zeroize();
    }
}

// ============================================
// Handshake State
// ============================================

/// State of one encryption handshake attempt.
///
/// Transient: lives only during connection setup and is consumed by
/// [`Handshake::derive_secrets`]. Exactly one handshake runs per
/// connection; a failed attempt is discarded, never retried in place.
pub struct Handshake<R: HandshakeRole> {
    remote: PublicKey,
    init_nonce: [u8; NONCE_SIZE],
    resp_nonce: [u8; NONCE_SIZE],
    ephemeral: EphemeralKeyPair,
    remote_ephemeral: Option<PublicKey>,
    remote_version: Option<u32>,
    local_cert_size: u16,
    remote_cert_size: u16,
    _role: PhantomData<R>,
}

impl Handshake<Initiator> {
    /// Starts a handshake towards a known peer.
    ///
    /// Generates the nonce and ephemeral key pair, signs
    /// `XOR(staticSecret, nonce)` with the ephemeral key and seals the
    /// auth message to the peer's static key.
    ///
    /// Returns the sealed auth packet to transmit and the in-progress
    /// state.
    ///
    /// # Errors
    /// Returns `SignatureCreation` or `EncryptionFailure` if assembling
    /// the message fails.
    pub fn initiate(
        local: &StaticKeyPair,
        remote: PublicKey,
        cert_size: u16,
    ) -> Result<(Vec<u8>, Self)> {
        let mut init_nonce = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut init_nonce);
        let ephemeral = EphemeralKeyPair::generate();

        let mut static_secret = local.ecdh(&remote);
        let digest = xor32(&static_secret, &init_nonce);
        static_secret.zeroize();
        let signature = ephemeral.sign_recoverable(&digest)?;

        let msg = AuthMsg {
            signature,
            static_pubkey: local.public_key().to_uncompressed(),
            nonce: init_nonce,
            version: HANDSHAKE_VERSION,
            cert_size,
        };
        let packet = seal(&remote, &msg.encode())?;
        trace!(remote = %remote, cert_size, "sealed handshake auth message");

        Ok((
            packet,
            Self {
                remote,
                init_nonce,
                resp_nonce: [0u8; NONCE_SIZE],
                ephemeral,
                remote_ephemeral: None,
                remote_version: None,
                local_cert_size: cert_size,
                remote_cert_size: 0,
                _role: PhantomData,
            },
        ))
    }

    /// Consumes the responder's sealed ack.
    ///
    /// # Errors
    /// - `DecryptionFailure` if the envelope does not open
    /// - `MalformedMessage` if the decoded structure is invalid
    /// - `KeyGeneration` if the embedded ephemeral key is not on the curve
    pub fn handle_ack(&mut self, local: &StaticKeyPair, sealed_ack: &[u8]) -> Result<()> {
        let plain = open(local, sealed_ack)?;
        let ack = AuthAck::decode(&plain)?;

        self.resp_nonce = ack.nonce;
        self.remote_ephemeral = Some(PublicKey::from_uncompressed(&ack.ephemeral_pubkey)?);
        self.remote_version = Some(ack.version);
        self.remote_cert_size = ack.cert_size;
        trace!(version = ack.version, cert_size = ack.cert_size, "consumed handshake ack");
        Ok(())
    }
}

impl Handshake<Responder> {
    /// Answers an incoming sealed auth message.
    ///
    /// Recovers the initiator's static key from the message and its
    /// ephemeral key from the embedded signature, then generates the
    /// responder's nonce and ephemeral key pair and seals the ack to the
    /// recovered static key.
    ///
    /// Returns the sealed ack to transmit and the in-progress state.
    ///
    /// # Errors
    /// - `DecryptionFailure` if the envelope does not open
    /// - `MalformedMessage` if the decoded structure is invalid
    /// - `SignatureRecovery` if the signature does not recover a usable key
    pub fn respond(
        local: &StaticKeyPair,
        sealed_auth: &[u8],
        cert_size: u16,
    ) -> Result<(Vec<u8>, Self)> {
        let plain = open(local, sealed_auth)?;
        let auth = AuthMsg::decode(&plain)?;
        let remote = PublicKey::from_uncompressed(&auth.static_pubkey)?;

        let mut static_secret = local.ecdh(&remote);
        let digest = xor32(&static_secret, &auth.nonce);
        static_secret.zeroize();
        let remote_ephemeral = recover_public_key(&digest, &auth.signature)?;
        debug!(remote = %remote, "recovered initiator identity");

        let mut resp_nonce = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut resp_nonce);
        let ephemeral = EphemeralKeyPair::generate();

        let ack = AuthAck {
            ephemeral_pubkey: ephemeral.public_key().to_uncompressed(),
            nonce: resp_nonce,
            version: HANDSHAKE_VERSION,
            cert_size,
        };
        let packet = seal(&remote, &ack.encode())?;

        Ok((
            packet,
            Self {
                remote,
                init_nonce: auth.nonce,
                resp_nonce,
                ephemeral,
                remote_ephemeral: Some(remote_ephemeral),
                remote_version: Some(auth.version),
                local_cert_size: cert_size,
                remote_cert_size: auth.cert_size,
                _role: PhantomData,
            },
        ))
    }
}

impl<R: HandshakeRole> Handshake<R> {
    /// Peer's static public key, once proven.
    #[must_use]
    pub const fn remote_static(&self) -> &PublicKey {
        &self.remote
    }

    /// Certificate size the peer advertised inside its signed message.
    #[must_use]
    pub const fn remote_cert_size(&self) -> u16 {
        self.remote_cert_size
    }

    /// Certificate size this side advertised.
    #[must_use]
    pub const fn local_cert_size(&self) -> u16 {
        self.local_cert_size
    }

    /// Derives the connection secrets from the completed exchange.
    ///
    /// `sealed_auth` and `sealed_ack` are the exact ciphertexts that
    /// crossed the wire; the MAC chains absorb them as transmitted.
    ///
    /// # Errors
    /// - `VersionMismatch` if the peer's version field is not bit-identical
    ///   to ours - no secrets are produced
    /// - `MalformedMessage` if called before the exchange completed
    pub fn derive_secrets(self, sealed_auth: &[u8], sealed_ack: &[u8]) -> Result<Secrets> {
        let remote_version = self
            .remote_version
            .ok_or_else(|| CoreError::malformed("handshake exchange incomplete"))?;
        if remote_version != HANDSHAKE_VERSION {
            return Err(CoreError::VersionMismatch {
                local: HANDSHAKE_VERSION,
                remote: remote_version,
            });
        }
        let remote_ephemeral = self
            .remote_ephemeral
            .ok_or_else(|| CoreError::malformed("handshake exchange incomplete"))?;

        // Keccak-256 derivation chain over the ephemeral agreement
        let mut ecdhe = self.ephemeral.ecdh(&remote_ephemeral);
        let nonce_hash = keccak256(&[&self.resp_nonce, &self.init_nonce]);
        let mut shared_secret = keccak256(&[&ecdhe, &nonce_hash]);
        let aes = keccak256(&[&ecdhe, &shared_secret]);
        let mac = keccak256(&[&ecdhe, &aes]);
        ecdhe.zeroize();
        shared_secret.zeroize();

        // Seed both MAC chains, then let the role strategy decide which
        // one speaks and which one listens
        let mac_auth = MacState::seeded(&xor32(&mac, &self.resp_nonce), sealed_auth);
        let mac_ack = MacState::seeded(&xor32(&mac, &self.init_nonce), sealed_ack);
        let (egress_mac, ingress_mac) = R::assign_macs(mac_auth, mac_ack);

        debug!(
            remote = %self.remote,
            initiator = R::INITIATOR,
            "connection secrets derived"
        );

        Ok(Secrets {
            remote: self.remote,
            aes,
            mac,
            egress_mac,
            ingress_mac,
        })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::suite;

    /// Runs a complete two-sided handshake and returns both secrets.
    fn run_handshake(
        a: &StaticKeyPair,
        b: &StaticKeyPair,
        a_cert: u16,
        b_cert: u16,
    ) -> (Secrets, Secrets) {
        let (auth, mut init) = Handshake::initiate(a, b.public_key(), a_cert).unwrap();
        let (ack, resp) = Handshake::respond(b, &auth, b_cert).unwrap();
        init.handle_ack(a, &ack).unwrap();

        let a_secrets = init.derive_secrets(&auth, &ack).unwrap();
        let b_secrets = resp.derive_secrets(&auth, &ack).unwrap();
        (a_secrets, b_secrets)
    }

    #[test]
    fn test_message_codec_roundtrip() {
        let msg = AuthMsg {
            signature: [0x01u8; SIGNATURE_SIZE],
            static_pubkey: [0x02u8; PUBLIC_KEY_SIZE],
            nonce: [0x03u8; NONCE_SIZE],
            version: HANDSHAKE_VERSION,
            cert_size: 512,
        };
        let encoded = msg.encode();
        assert_eq!(encoded.len(), AUTH_MSG_LEN);
        assert_eq!(AuthMsg::decode(&encoded).unwrap(), msg);

        let ack = AuthAck {
            ephemeral_pubkey: [0x04u8; PUBLIC_KEY_SIZE],
            nonce: [0x05u8; NONCE_SIZE],
            version: HANDSHAKE_VERSION,
            cert_size: 0,
        };
        let encoded = ack.encode();
        assert_eq!(encoded.len(), AUTH_ACK_LEN);
        assert_eq!(AuthAck::decode(&encoded).unwrap(), ack);
    }

    #[test]
    fn test_message_codec_rejects_bad_lengths() {
        assert!(matches!(
            AuthMsg::decode(&[0u8; AUTH_MSG_LEN - 1]),
            Err(CoreError::MessageTooShort { .. })
        ));
        assert!(matches!(
            AuthMsg::decode(&[0u8; AUTH_MSG_LEN + 1]),
            Err(CoreError::MalformedMessage { .. })
        ));
        assert!(matches!(
            AuthAck::decode(&[0u8; 3]),
            Err(CoreError::MessageTooShort { .. })
        ));
    }

    #[test]
    fn test_secrets_agree_and_mac_chains_cross() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();
        let (a_secrets, b_secrets) = run_handshake(&a, &b, 0, 0);

        assert_eq!(a_secrets.aes, b_secrets.aes);
        assert_eq!(a_secrets.mac, b_secrets.mac);

        // A's egress chain must be B's ingress chain, and vice versa
        assert_eq!(a_secrets.egress_mac.digest(), b_secrets.ingress_mac.digest());
        assert_eq!(a_secrets.ingress_mac.digest(), b_secrets.egress_mac.digest());
        assert_ne!(a_secrets.egress_mac.digest(), a_secrets.ingress_mac.digest());

        // Each side learned the other's identity
        assert_eq!(a_secrets.remote, b.public_key());
        assert_eq!(b_secrets.remote, a.public_key());
    }

    #[test]
    fn test_cert_sizes_advertised_both_ways() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();

        let (auth, mut init) = Handshake::initiate(&a, b.public_key(), 311).unwrap();
        let (ack, resp) = Handshake::respond(&b, &auth, 311).unwrap();
        init.handle_ack(&a, &ack).unwrap();

        assert_eq!(resp.remote_cert_size(), 311);
        assert_eq!(init.remote_cert_size(), 311);
    }

    #[test]
    fn test_session_uniqueness() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();

        let (first_a, _) = run_handshake(&a, &b, 0, 0);
        let (second_a, _) = run_handshake(&a, &b, 0, 0);

        // Fresh nonces and ephemerals per attempt: no shared key material
        assert_ne!(first_a.aes, second_a.aes);
        assert_ne!(first_a.mac, second_a.mac);
    }

    #[test]
    fn test_version_mismatch_responder_side() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();

        // Hand-craft an auth message with a foreign version constant
        let ephemeral = EphemeralKeyPair::generate();
        let mut nonce = [0u8; NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut nonce);
        let digest = suite::xor32(&a.ecdh(&b.public_key()), &nonce);
        let msg = AuthMsg {
            signature: ephemeral.sign_recoverable(&digest).unwrap(),
            static_pubkey: a.public_key().to_uncompressed(),
            nonce,
            version: HANDSHAKE_VERSION + 1,
            cert_size: 0,
        };
        let sealed_auth = suite::seal(&b.public_key(), &msg.encode()).unwrap();

        let (sealed_ack, resp) = Handshake::respond(&b, &sealed_auth, 0).unwrap();
        let result = resp.derive_secrets(&sealed_auth, &sealed_ack);
        assert!(matches!(result, Err(CoreError::VersionMismatch { .. })));
    }

    #[test]
    fn test_version_mismatch_initiator_side() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();

        let (sealed_auth, mut init) = Handshake::initiate(&a, b.public_key(), 0).unwrap();

        // Hand-craft an ack with a foreign version constant
        let ephemeral = EphemeralKeyPair::generate();
        let ack = AuthAck {
            ephemeral_pubkey: ephemeral.public_key().to_uncompressed(),
            nonce: [0x07u8; NONCE_SIZE],
            version: HANDSHAKE_VERSION + 1,
            cert_size: 0,
        };
        let sealed_ack = suite::seal(&a.public_key(), &ack.encode()).unwrap();

        init.handle_ack(&a, &sealed_ack).unwrap();
        let result = init.derive_secrets(&sealed_auth, &sealed_ack);
        assert!(matches!(result, Err(CoreError::VersionMismatch { .. })));
    }

    #[test]
    fn test_respond_rejects_tampered_auth() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();

        let (mut auth, _) = Handshake::initiate(&a, b.public_key(), 0).unwrap();
        auth[40] ^= 0x01;

        assert!(matches!(
            Handshake::respond(&b, &auth, 0),
            Err(CoreError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_respond_rejects_wrong_recipient() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();
        let c = StaticKeyPair::generate();

        let (auth, _) = Handshake::initiate(&a, b.public_key(), 0).unwrap();
        assert!(matches!(
            Handshake::respond(&c, &auth, 0),
            Err(CoreError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_derive_before_ack_fails() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();

        let (auth, init) = Handshake::initiate(&a, b.public_key(), 0).unwrap();
        let result = init.derive_secrets(&auth, &[]);
        assert!(matches!(result, Err(CoreError::MalformedMessage { .. })));
    }

    #[test]
    fn test_sealed_packet_sizes() {
        let a = StaticKeyPair::generate();
        let b = StaticKeyPair::generate();

        let (auth, _) = Handshake::initiate(&a, b.public_key(), 0).unwrap();
        assert_eq!(auth.len(), SEALED_AUTH_MSG_LEN);

        let (ack, _) = Handshake::respond(&b, &auth, 0).unwrap();
        assert_eq!(ack.len(), SEALED_AUTH_ACK_LEN);
    }
}
