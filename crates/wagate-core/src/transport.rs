//! Transport adapter port.
//!
//! A transport owns one connection to the messaging network: it emits a
//! stream of typed connection-state and inbound-message events, accepts
//! outbound send requests, and accepts a logout request. Raw wire payloads
//! are decoded into the closed [`RawPayload`] variant at this boundary so
//! nothing downstream has to guess at duck-typed event shapes.
//!
//! Implementations live outside this crate ([`channel`] ships an
//! in-process one for development and tests); the session runner consumes
//! them through [`TransportFactory`].

use std::future::Future;

use tokio::sync::mpsc;

use wagate_types::error::TransportError;
use wagate_types::session::CloseReason;

use crate::credential::{CredentialRecord, Credentials};
use crate::session::profile::ConnectionProfile;

pub mod channel;

/// Event emitted by a transport over its per-session channel.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A pairing challenge was issued; a human must present it out-of-band.
    PairingCodeIssued(String),
    /// The connection reached the authenticated `open` state.
    Opened,
    /// The connection closed, with a classified reason.
    Closed(CloseReason),
    /// The provider rotated authentication material; the session persists it.
    CredentialsUpdated(Vec<CredentialRecord>),
    /// A batch of inbound messages arrived.
    Inbound(RawInboundEvent),
}

/// A raw inbound event as delivered by the wire protocol. May carry zero
/// or more messages; zero-message events are a no-op downstream.
#[derive(Debug, Clone, Default)]
pub struct RawInboundEvent {
    pub messages: Vec<RawMessage>,
}

/// One raw inbound message, decoded but not yet normalized.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Provider-assigned message id.
    pub id: String,
    /// The conversation address (direct peer or group).
    pub chat: String,
    /// For group messages: the participant's address, possibly in an
    /// alternate-identifier form (e.g. `1234@lid`).
    pub participant: Option<String>,
    /// Human-readable sender label, when the provider supplies one.
    pub sender_display_name: Option<String>,
    /// Provider epoch seconds.
    pub timestamp: i64,
    /// True when the message is the account's own echo.
    pub from_me: bool,
    pub payload: RawPayload,
}

/// Closed set of wire payload variants, in classification priority order.
#[derive(Debug, Clone)]
pub enum RawPayload {
    Text {
        body: String,
    },
    Image {
        caption: Option<String>,
        media: MediaRef,
    },
    Audio {
        media: MediaRef,
        duration_seconds: Option<u32>,
        is_voice_note: bool,
    },
    Video {
        caption: Option<String>,
        media: MediaRef,
    },
    Document {
        media: MediaRef,
        file_name: Option<String>,
    },
    /// Anything the decoder does not support; skipped entirely.
    Unsupported,
}

/// Opaque handle to a downloadable media payload.
#[derive(Debug, Clone)]
pub struct MediaRef {
    /// Provider-scoped retrieval handle.
    pub handle: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// One live connection to the messaging network.
pub trait Transport: Send + Sync + 'static {
    /// Canonical address of the connected account, once known.
    fn self_address(&self) -> Option<String>;

    /// Send a text message to an already-normalized address.
    fn send_text(
        &self,
        to: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Gracefully log the device out of the remote account.
    fn logout(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Retrieve the bytes behind a media reference.
    fn download_media(
        &self,
        media: &MediaRef,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

/// Builds a fresh transport bound to an instance's credentials.
///
/// Every (re)connect attempt constructs a new transport; the previous one
/// is retired by its owning session before the new one is installed.
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: Transport;

    fn connect(
        &self,
        instance_id: &str,
        credentials: Credentials,
        profile: &ConnectionProfile,
    ) -> impl Future<
        Output = Result<(Self::Transport, mpsc::Receiver<TransportEvent>), TransportError>,
    > + Send;
}
