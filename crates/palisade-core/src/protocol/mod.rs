// ============================================
// File: crates/palisade-core/src/protocol/mod.rs
// ============================================
//! # Capability Protocol Module
//!
//! ## Creation Reason
//! Defines the first messages exchanged over the live frame codec: the
//! capability hello that negotiates compression and subprotocol versions,
//! and the disconnect notice with its reason code.
//!
//! ## Main Functionality
//! - [`messages`]: `Hello`, `Capability`, `Disconnect` definitions
//! - [`codec`]: Binary serialization for the capability messages
//! - [`version`]: Protocol version and the compression threshold

pub mod codec;
pub mod messages;
pub mod version;

// Re-export primary types at module level
pub use codec::{decode_disconnect, decode_hello, encode_disconnect, encode_hello, Codec};
pub use messages::{
    Capability, Disconnect, DisconnectReason, Hello, DISCONNECT_TAG, FIRST_SUBPROTOCOL_TAG,
    HELLO_TAG, MAX_BASE_MESSAGE_SIZE,
};
pub use version::{ProtocolVersion, CURRENT_PROTOCOL_VERSION, MIN_COMPRESSION_VERSION};
