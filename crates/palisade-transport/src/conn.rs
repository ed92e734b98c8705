// ============================================
// File: crates/palisade-transport/src/conn.rs
// ============================================
//! # Connection State Machine
//!
//! ## Creation Reason
//! Composes the handshake engine, the optional certificate exchange and
//! the frame codec into the connection object the peer-management layer
//! consumes: read, write, close.
//!
//! ## Main Logical Flow
//! 1. `initiate`/`accept` drive the encryption handshake over the raw
//!    stream under one setup deadline
//! 2. The optional certificate exchange binds PKI identity to the proven
//!    static key
//! 3. The frame codec comes up and the capability hello crosses in both
//!    directions - the local send runs concurrently with the blocking
//!    read, rendezvoused through a single-slot channel
//! 4. Steady state: independent read/write locks, one deadline per
//!    blocking call
//!
//! ## Failure Policy
//! Any failure in any phase discards the connection. There is no retry,
//! no renegotiation and no recovery transition; a fresh attempt starts a
//! fully independent handshake with fresh nonces and ephemeral keys.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `Timeout` is deliberately indistinguishable from protocol failure in
//!   severity: both are fatal to the connection
//! - Do not add a reconnect path here; that belongs to peer management

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{debug, info};

use palisade_common::types::NodeId;
use palisade_core::crypto::{PublicKey, StaticKeyPair};
use palisade_core::error::CoreError;
use palisade_core::framing::{codec_pair, FrameDecoder, FrameEncoder};
use palisade_core::handshake::{
    Handshake, Secrets, SEALED_AUTH_ACK_LEN, SEALED_AUTH_MSG_LEN,
};
use palisade_core::protocol::{
    decode_disconnect, decode_hello, encode_disconnect, encode_hello, Disconnect,
    DisconnectReason, Hello, DISCONNECT_TAG, HELLO_TAG, MAX_BASE_MESSAGE_SIZE,
};

use crate::cert;
use crate::config::TransportConfig;
use crate::error::{Result, TransportError};

// ============================================
// ConnState
// ============================================

/// Connection lifecycle state.
///
/// `Closed` is terminal and reachable from every state; there is no
/// transition back to an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Raw stream accepted, nothing exchanged yet.
    Connecting,
    /// Encryption handshake in flight.
    EncHandshaking,
    /// Optional certificate transfer in flight.
    CertExchange,
    /// Capability hello in flight over the live codec.
    CapabilityHandshaking,
    /// Steady state.
    Established,
    /// Terminal.
    Closed,
}

impl ConnState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::EncHandshaking => 1,
            Self::CertExchange => 2,
            Self::CapabilityHandshaking => 3,
            Self::Established => 4,
            Self::Closed => 5,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::EncHandshaking,
            2 => Self::CertExchange,
            3 => Self::CapabilityHandshaking,
            4 => Self::Established,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Connecting => "connecting",
            Self::EncHandshaking => "enc-handshaking",
            Self::CertExchange => "cert-exchange",
            Self::CapabilityHandshaking => "capability-handshaking",
            Self::Established => "established",
            Self::Closed => "closed",
        };
        f.write_str(text)
    }
}

/// Logs and performs a setup-phase state transition.
fn advance(from: ConnState, to: ConnState) -> ConnState {
    debug!(%from, %to, "connection state");
    to
}

// ============================================
// Message
// ============================================

/// One application message read from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Frame type tag.
    pub tag: u8,
    /// Decrypted, decompressed payload.
    pub payload: Vec<u8>,
}

// ============================================
// Connection
// ============================================

struct ReadSide<S> {
    stream: ReadHalf<S>,
    codec: FrameDecoder,
}

struct WriteSide<S> {
    stream: WriteHalf<S>,
    codec: FrameEncoder,
}

/// An established, authenticated, encrypted connection.
///
/// Read and write paths are guarded by independent locks: one reader and
/// one writer proceed concurrently, same-direction calls serialize.
pub struct Connection<S> {
    reader: Mutex<ReadSide<S>>,
    writer: Mutex<WriteSide<S>>,
    state: AtomicU8,
    remote: PublicKey,
    config: TransportConfig,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Dials: runs the full setup as the initiator.
    ///
    /// Returns the established connection and the peer's hello.
    ///
    /// # Errors
    /// Any handshake, certificate or capability failure aborts setup;
    /// deadline expiry surfaces as `Timeout`.
    pub async fn initiate(
        stream: S,
        identity: &StaticKeyPair,
        remote: PublicKey,
        hello: Hello,
        config: TransportConfig,
    ) -> Result<(Self, Hello)> {
        config.validate()?;
        let deadline = config.handshake_timeout;
        timeout(
            deadline,
            Self::setup_initiator(stream, identity, remote, hello, config),
        )
        .await
        .map_err(|_| TransportError::Timeout {
            operation: "connection setup",
        })?
    }

    /// Answers: runs the full setup as the responder.
    ///
    /// The peer's identity is learned from its auth message, not known up
    /// front.
    ///
    /// # Errors
    /// Any handshake, certificate or capability failure aborts setup;
    /// deadline expiry surfaces as `Timeout`.
    pub async fn accept(
        stream: S,
        identity: &StaticKeyPair,
        hello: Hello,
        config: TransportConfig,
    ) -> Result<(Self, Hello)> {
        config.validate()?;
        let deadline = config.handshake_timeout;
        timeout(deadline, Self::setup_responder(stream, identity, hello, config))
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "connection setup",
            })?
    }

    async fn setup_initiator(
        mut stream: S,
        identity: &StaticKeyPair,
        remote: PublicKey,
        hello: Hello,
        config: TransportConfig,
    ) -> Result<(Self, Hello)> {
        let mut state = advance(ConnState::Connecting, ConnState::EncHandshaking);

        let (auth, mut handshake) =
            Handshake::initiate(identity, remote, config.advertised_cert_size())?;
        stream.write_all(&auth).await?;
        let mut ack = vec![0u8; SEALED_AUTH_ACK_LEN];
        stream.read_exact(&mut ack).await?;
        handshake.handle_ack(identity, &ack)?;

        if let Some(cert_config) = &config.certificate {
            state = advance(state, ConnState::CertExchange);
            cert::check_advertisement(handshake.remote_cert_size(), cert_config)?;
            cert::exchange_as_initiator(
                &mut stream,
                cert_config,
                handshake.remote_cert_size(),
                handshake.remote_static(),
            )
            .await?;
        }

        let secrets = handshake.derive_secrets(&auth, &ack)?;
        Self::establish(stream, secrets, hello, config, state).await
    }

    async fn setup_responder(
        mut stream: S,
        identity: &StaticKeyPair,
        hello: Hello,
        config: TransportConfig,
    ) -> Result<(Self, Hello)> {
        let mut state = advance(ConnState::Connecting, ConnState::EncHandshaking);

        let mut auth = vec![0u8; SEALED_AUTH_MSG_LEN];
        stream.read_exact(&mut auth).await?;
        let (ack, handshake) =
            Handshake::respond(identity, &auth, config.advertised_cert_size())?;

        // Check the advertisement before the ack goes out; a doomed
        // exchange should not cost the peer a certificate transfer
        if let Some(cert_config) = &config.certificate {
            cert::check_advertisement(handshake.remote_cert_size(), cert_config)?;
        }
        stream.write_all(&ack).await?;

        if let Some(cert_config) = &config.certificate {
            state = advance(state, ConnState::CertExchange);
            cert::exchange_as_responder(
                &mut stream,
                cert_config,
                handshake.remote_cert_size(),
                handshake.remote_static(),
            )
            .await?;
        }

        let secrets = handshake.derive_secrets(&auth, &ack)?;
        Self::establish(stream, secrets, hello, config, state).await
    }

    /// Brings up the frame codec and runs the capability handshake.
    async fn establish(
        stream: S,
        secrets: Secrets,
        local_hello: Hello,
        config: TransportConfig,
        state: ConnState,
    ) -> Result<(Self, Hello)> {
        let mut state = advance(state, ConnState::CapabilityHandshaking);
        let remote = secrets.remote.clone();
        let (encoder, decoder) = codec_pair(&secrets);
        drop(secrets);

        let (read_half, write_half) = tokio::io::split(stream);
        let mut read_side = ReadSide {
            stream: read_half,
            codec: decoder,
        };
        let mut write_side = WriteSide {
            stream: write_half,
            codec: encoder,
        };

        // The local hello goes out concurrently with the blocking read of
        // the peer's; the single-slot channel keeps a peer-initiated
        // disconnect from being lost while the write is still in flight
        let (result_tx, result_rx) = oneshot::channel();
        let hello_bytes = encode_hello(&local_hello);
        tokio::spawn(async move {
            let outcome = write_side
                .codec
                .write_frame(&mut write_side.stream, HELLO_TAG, &hello_bytes)
                .await;
            let _ = result_tx.send((outcome, write_side));
        });

        let read_outcome = read_capability_hello(&mut read_side).await;
        let (write_outcome, mut write_side) = result_rx.await.map_err(|_| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "hello writer vanished",
            ))
        })?;
        // A read error - including the peer's disconnect reason - takes
        // precedence over a write error
        let their_hello = read_outcome?;
        write_outcome?;

        if their_hello.node_id.as_bytes().iter().all(|&b| b == 0) {
            return Err(TransportError::Disconnected(
                DisconnectReason::InvalidIdentity,
            ));
        }
        if their_hello.node_id != remote.node_id() {
            return Err(TransportError::Disconnected(
                DisconnectReason::UnexpectedIdentity,
            ));
        }

        // Compression is decided exactly once, here, and never revisited
        if their_hello.version.supports_compression() {
            write_side.codec.enable_compression();
            read_side.codec.enable_compression();
        }

        state = advance(state, ConnState::Established);
        info!(
            remote = %remote,
            version = %their_hello.version,
            client = %their_hello.client_name,
            "connection established"
        );

        Ok((
            Self {
                reader: Mutex::new(read_side),
                writer: Mutex::new(write_side),
                state: AtomicU8::new(state.as_u8()),
                remote,
                config,
            },
            their_hello,
        ))
    }

    /// Reads one application message.
    ///
    /// A disconnect notice from the peer surfaces as
    /// `Disconnected(reason)`. Any failure - timeout included - closes
    /// the connection.
    ///
    /// # Errors
    /// `Closed`, `Timeout`, `Disconnected` or any codec failure.
    pub async fn read_msg(&self) -> Result<Message> {
        self.ensure_open()?;
        let mut guard = self.reader.lock().await;
        let side = &mut *guard;
        let outcome = timeout(
            self.config.frame_read_timeout,
            side.codec.read_frame(&mut side.stream),
        )
        .await;
        drop(guard);

        let (tag, payload) = match outcome {
            Err(_) => {
                self.mark_closed();
                return Err(TransportError::Timeout {
                    operation: "frame read",
                });
            }
            Ok(Err(err)) => {
                self.mark_closed();
                return Err(err.into());
            }
            Ok(Ok(frame)) => frame,
        };

        if tag == DISCONNECT_TAG {
            self.mark_closed();
            let reason = decode_disconnect(&payload)
                .map(|notice| notice.reason)
                .unwrap_or(DisconnectReason::Other);
            return Err(TransportError::Disconnected(reason));
        }

        Ok(Message { tag, payload })
    }

    /// Writes one application message.
    ///
    /// # Errors
    /// `Closed`, `Timeout` or any codec failure; all of them close the
    /// connection.
    pub async fn write_msg(&self, tag: u8, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let mut guard = self.writer.lock().await;
        let side = &mut *guard;
        let outcome = timeout(
            self.config.frame_write_timeout,
            side.codec.write_frame(&mut side.stream, tag, payload),
        )
        .await;
        drop(guard);

        match outcome {
            Err(_) => {
                self.mark_closed();
                Err(TransportError::Timeout {
                    operation: "frame write",
                })
            }
            Ok(Err(err)) => {
                self.mark_closed();
                Err(err.into())
            }
            Ok(Ok(())) => Ok(()),
        }
    }

    /// Closes the connection, sending a best-effort disconnect notice
    /// under the grace deadline (skipped for network errors - the pipe is
    /// known to be bad).
    pub async fn close(&self, reason: DisconnectReason) {
        let previous = self.state.swap(ConnState::Closed.as_u8(), Ordering::SeqCst);
        if previous == ConnState::Closed.as_u8() {
            return;
        }

        let mut guard = self.writer.lock().await;
        let side = &mut *guard;
        if reason != DisconnectReason::NetworkError {
            let notice = encode_disconnect(&Disconnect::new(reason));
            let _ = timeout(
                self.config.disconnect_grace,
                side.codec
                    .write_frame(&mut side.stream, DISCONNECT_TAG, &notice),
            )
            .await;
        }
        let _ = side.stream.shutdown().await;
        debug!(remote = %self.remote, %reason, "connection closed");
    }

    /// Peer's static public key as proven by the handshake.
    #[must_use]
    pub const fn remote_public_key(&self) -> &PublicKey {
        &self.remote
    }

    /// Peer's node identifier.
    #[must_use]
    pub fn remote_node_id(&self) -> NodeId {
        self.remote.node_id()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnState {
        ConnState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state() == ConnState::Closed {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn mark_closed(&self) {
        self.state
            .store(ConnState::Closed.as_u8(), Ordering::SeqCst);
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("remote", &self.remote)
            .field("state", &ConnState::from_u8(self.state.load(Ordering::SeqCst)))
            .finish_non_exhaustive()
    }
}

/// Reads the first frame off the live codec and interprets it as the
/// capability handshake: a hello, or a disconnect notice explaining why
/// there will not be one.
async fn read_capability_hello<S>(side: &mut ReadSide<S>) -> Result<Hello>
where
    S: AsyncRead + AsyncWrite,
{
    let (tag, payload) = side.codec.read_frame(&mut side.stream).await?;
    if payload.len() > MAX_BASE_MESSAGE_SIZE {
        return Err(CoreError::malformed("base-protocol message too large").into());
    }
    match tag {
        DISCONNECT_TAG => {
            let notice = decode_disconnect(&payload)?;
            Err(TransportError::Disconnected(notice.reason))
        }
        HELLO_TAG => Ok(decode_hello(&payload)?),
        tag => Err(TransportError::UnexpectedFrame { tag }),
    }
}

// ============================================
// Tests
// ============================================
