//! In-process channel transport.
//!
//! A controllable [`Transport`] implementation backed by tokio channels.
//! The gateway's tests script connection lifecycles and inbound traffic
//! through a [`TransportController`]; the development binary wires it as
//! the default factory so the whole stack runs without a live protocol
//! driver. A real driver replaces this by implementing the port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::mpsc;

use wagate_types::error::TransportError;
use wagate_types::session::CloseReason;

use crate::credential::{CredentialRecord, Credentials};
use crate::session::profile::ConnectionProfile;

use super::{MediaRef, RawInboundEvent, Transport, TransportEvent, TransportFactory};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A message accepted by [`ChannelTransport::send_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub to: String,
    pub body: String,
}

#[derive(Default)]
struct ChannelShared {
    self_address: Mutex<Option<String>>,
    sent: Mutex<Vec<OutboundRecord>>,
    media: DashMap<String, Vec<u8>>,
    reject_sends: AtomicBool,
    fail_logout: AtomicBool,
}

/// Transport half handed to the session runner.
pub struct ChannelTransport {
    shared: Arc<ChannelShared>,
}

impl Transport for ChannelTransport {
    fn self_address(&self) -> Option<String> {
        self.shared
            .self_address
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<(), TransportError> {
        if self.shared.reject_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("send rejected by peer".to_string()));
        }
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(OutboundRecord {
                to: to.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }

    async fn logout(&self) -> Result<(), TransportError> {
        if self.shared.fail_logout.load(Ordering::SeqCst) {
            Err(TransportError::NotConnected)
        } else {
            Ok(())
        }
    }

    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, TransportError> {
        self.shared
            .media
            .get(&media.handle)
            .map(|bytes| bytes.clone())
            .ok_or_else(|| TransportError::MediaUnavailable(format!("no payload for '{}'", media.handle)))
    }
}

/// Control half: scripts events into the most recent transport created for
/// an instance.
#[derive(Clone)]
pub struct TransportController {
    events: mpsc::Sender<TransportEvent>,
    shared: Arc<ChannelShared>,
}

impl TransportController {
    async fn emit(&self, event: TransportEvent) {
        // The receiver disappears when the session retires the adapter;
        // late events are dropped, matching a torn-down socket.
        let _ = self.events.send(event).await;
    }

    pub async fn issue_pairing_code(&self, code: impl Into<String>) {
        self.emit(TransportEvent::PairingCodeIssued(code.into())).await;
    }

    pub async fn open(&self) {
        self.emit(TransportEvent::Opened).await;
    }

    pub async fn close(&self, reason: CloseReason) {
        self.emit(TransportEvent::Closed(reason)).await;
    }

    pub async fn update_credentials(&self, records: Vec<CredentialRecord>) {
        self.emit(TransportEvent::CredentialsUpdated(records)).await;
    }

    pub async fn inbound(&self, event: RawInboundEvent) {
        self.emit(TransportEvent::Inbound(event)).await;
    }

    /// Set the connected account's own address (normally learned during
    /// pairing).
    pub fn set_self_address(&self, address: impl Into<String>) {
        *self
            .shared
            .self_address
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(address.into());
    }

    /// Stage downloadable bytes behind a media handle.
    pub fn put_media(&self, handle: impl Into<String>, bytes: Vec<u8>) {
        self.shared.media.insert(handle.into(), bytes);
    }

    /// Make subsequent `send_text` calls fail.
    pub fn reject_sends(&self, reject: bool) {
        self.shared.reject_sends.store(reject, Ordering::SeqCst);
    }

    /// Make `logout` fail, emulating a half-closed connection.
    pub fn fail_logout(&self, fail: bool) {
        self.shared.fail_logout.store(fail, Ordering::SeqCst);
    }

    /// Everything the transport accepted for sending, in order.
    pub fn sent(&self) -> Vec<OutboundRecord> {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Factory producing channel transports; keeps the controller for the
/// latest transport of each instance.
#[derive(Default)]
pub struct ChannelTransportFactory {
    controllers: DashMap<String, TransportController>,
    connect_counts: DashMap<String, usize>,
}

impl ChannelTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller for the most recently created transport of an instance.
    pub fn controller(&self, instance_id: &str) -> Option<TransportController> {
        self.controllers.get(instance_id).map(|c| c.clone())
    }

    /// Number of transports created for an instance so far.
    pub fn connect_count(&self, instance_id: &str) -> usize {
        self.connect_counts
            .get(instance_id)
            .map(|c| *c)
            .unwrap_or_default()
    }
}

impl TransportFactory for ChannelTransportFactory {
    type Transport = ChannelTransport;

    async fn connect(
        &self,
        instance_id: &str,
        _credentials: Credentials,
        _profile: &ConnectionProfile,
    ) -> Result<(ChannelTransport, mpsc::Receiver<TransportEvent>), TransportError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(ChannelShared::default());
        *self.connect_counts.entry(instance_id.to_string()).or_insert(0) += 1;
        self.controllers.insert(
            instance_id.to_string(),
            TransportController {
                events: tx,
                shared: Arc::clone(&shared),
            },
        );
        Ok((ChannelTransport { shared }, rx))
    }
}
