// ============================================
// File: crates/palisade-core/src/lib.rs
// ============================================
//! # Palisade Core - Handshake Engine and Frame Codec
//!
//! ## Creation Reason
//! Implements the protocol logic of the Palisade transport: the
//! authenticated encryption handshake, the MAC-chained frame codec and the
//! capability messages, without owning any sockets.
//!
//! ## Main Functionality
//! - [`crypto`]: Key types and primitive suite (secp256k1, Keccak-256, ECIES)
//! - [`handshake`]: Authenticated key exchange and secrets derivation
//! - [`framing`]: Encrypted, MAC-chained frame encoder/decoder
//! - [`protocol`]: Capability hello, disconnect reasons, protocol version
//!
//! ## Protocol Design
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Handshake Phase                          │
//! │  Initiator                                     Responder     │
//! │    │  sealed auth (sig, static key, nonce) ───────►  │       │
//! │    │  ◄─────── sealed ack (ephemeral key, nonce)     │       │
//! │    │                                                 │       │
//! │    │        ephemeral ECDH + Keccak-256 chain        │       │
//! │    │                      │                          │       │
//! │    │                      ▼                          │       │
//! │    │    Secrets: AES key, MAC key, MAC states        │       │
//! └──────────────────────────────────────────────────────────────┘
//!
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Framing Phase                            │
//! │                                                              │
//! │  header(16, AES-CTR) ║ header MAC(16) ║ body ║ trailer(16)   │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All primitive implementations come from RustCrypto / audited crates
//! - NEVER roll your own crypto
//! - The MAC states are strict causal chains - any reordering of the
//!   absorb calls breaks wire compatibility

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod protocol;

// Re-export primary types at crate level
pub use error::{CoreError, Result};
pub use framing::{FrameDecoder, FrameEncoder};
pub use handshake::{Handshake, Initiator, Responder, Secrets};
