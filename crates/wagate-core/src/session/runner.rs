//! Session runner: the receive loop around the pure state machine.
//!
//! Each session owns exactly one event pump task draining its transport's
//! channel, so state transitions are processed strictly in order with no
//! locking across sessions. Reconnect timers are spawned tasks guarded by
//! a `CancellationToken` that `disconnect`/`clear_session` cancel before
//! teardown, so an intentionally torn-down session is never resurrected.
//!
//! Inbound messages are normalized inside the pump (preserving per-session
//! FIFO through media downloads) and handed to a dedicated relay task via
//! a bounded queue, so a slow webhook endpoint back-pressures only its own
//! queue and never stalls event ingestion.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use wagate_types::error::SessionError;
use wagate_types::message::CanonicalMessage;
use wagate_types::session::{ConnectionState, SendReceipt, SessionSummary, StatusSnapshot};

use crate::credential::{CredentialStore, Credentials};
use crate::jid;
use crate::normalize;
use crate::relay::{WebhookRelay, WebhookSender, WebhookTarget};
use crate::transport::{Transport, TransportEvent, TransportFactory};

use super::greeting::greeting_body;
use super::profile::{
    ConnectionProfile, RESTART_PAUSE, TRANSIENT_RECONNECT_DELAY, WIPE_FAILED_RECONNECT_DELAY,
};
use super::state::{Action, SessionState};

/// Canonical messages buffered per session awaiting webhook delivery.
/// When the queue is full the newest record is dropped (delivery is
/// best-effort; ingestion must not block).
const RELAY_QUEUE_CAPACITY: usize = 256;

struct Link<T> {
    transport: Option<Arc<T>>,
    pump: Option<JoinHandle<()>>,
    /// Cancels any reconnect timer scheduled for the current connection.
    reconnect_guard: CancellationToken,
}

impl<T> Link<T> {
    fn retire(&mut self) {
        self.reconnect_guard.cancel();
        self.reconnect_guard = CancellationToken::new();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.transport = None;
    }
}

/// One logical chat-account connection, independently lifecycled.
pub struct Session<F, C, S>
where
    F: TransportFactory,
    C: CredentialStore,
    S: WebhookSender,
{
    id: String,
    phone_number: Option<String>,
    profile: ConnectionProfile,
    factory: Arc<F>,
    credentials: Arc<C>,
    relay: WebhookRelay<S>,
    webhook_override: WebhookTarget,
    state: Mutex<SessionState>,
    link: tokio::sync::Mutex<Link<F::Transport>>,
    relay_tx: mpsc::Sender<CanonicalMessage>,
    /// Self-reference for the tasks this session spawns (pump, reconnect
    /// timers). Created through `Arc::new_cyclic`.
    me: Weak<Self>,
}

impl<F, C, S> Session<F, C, S>
where
    F: TransportFactory,
    C: CredentialStore,
    S: WebhookSender,
{
    /// Create a session (in `disconnected` state) and start its relay
    /// worker. Must be called within a tokio runtime.
    pub fn new(
        id: impl Into<String>,
        phone_number: Option<String>,
        profile: ConnectionProfile,
        factory: Arc<F>,
        credentials: Arc<C>,
        relay: WebhookRelay<S>,
    ) -> Arc<Self> {
        let (relay_tx, mut relay_rx) = mpsc::channel::<CanonicalMessage>(RELAY_QUEUE_CAPACITY);
        let session = Arc::new_cyclic(|me| Self {
            id: id.into(),
            phone_number,
            profile,
            factory,
            credentials,
            relay,
            webhook_override: WebhookTarget::default(),
            state: Mutex::new(SessionState::new()),
            link: tokio::sync::Mutex::new(Link {
                transport: None,
                pump: None,
                reconnect_guard: CancellationToken::new(),
            }),
            relay_tx,
            me: me.clone(),
        });

        // Relay worker: drains the per-session queue in FIFO order. Ends
        // when the session (the last sender) is dropped.
        let relay = session.relay.clone();
        let target = session.webhook_override.clone();
        tokio::spawn(async move {
            while let Some(message) = relay_rx.recv().await {
                relay.deliver(&target, &message).await;
            }
        });

        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    /// Per-session webhook target; overrides the registry default when set.
    pub fn webhook_override(&self) -> &WebhookTarget {
        &self.webhook_override
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lock_state().connection_state
    }

    pub fn qr_challenge(&self) -> Option<String> {
        self.lock_state().qr_challenge.clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock_state().snapshot()
    }

    pub fn summary(&self) -> SessionSummary {
        let snapshot = self.snapshot();
        SessionSummary {
            id: self.id.clone(),
            phone_number: self.phone_number.clone(),
            connection_state: snapshot.connection_state,
            has_qr_challenge: snapshot.has_qr_challenge,
        }
    }

    /// Start (or restart) the connection.
    ///
    /// Always builds a fresh transport. The prior transport, its pump
    /// task, and any pending reconnect timer are retired first, so no
    /// stale subscription can leak events into the new connection.
    pub async fn connect(&self) -> StatusSnapshot {
        let mut link = self.link.lock().await;
        link.retire();
        self.lock_state().begin_connect();
        tracing::info!(instance = %self.id, profile = %self.profile.name, "connecting");

        let credentials = match self.credentials.load(&self.id).await {
            Ok(credentials) => credentials,
            Err(err) => {
                tracing::warn!(instance = %self.id, error = %err, "credential load failed, pairing fresh");
                Credentials::empty()
            }
        };

        match self.factory.connect(&self.id, credentials, &self.profile).await {
            Ok((transport, events)) => {
                let transport = Arc::new(transport);
                link.transport = Some(Arc::clone(&transport));
                if let Some(session) = self.me.upgrade() {
                    link.pump = Some(tokio::spawn(async move {
                        session.pump(transport, events).await;
                    }));
                }
            }
            Err(err) => {
                tracing::warn!(instance = %self.id, error = %err, "transport construction failed");
                let guard = link.reconnect_guard.clone();
                self.schedule_reconnect(self.profile.reconnect_delay, guard);
            }
        }

        drop(link);
        self.snapshot()
    }

    async fn pump(
        self: Arc<Self>,
        transport: Arc<F::Transport>,
        mut events: mpsc::Receiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            let actions = self.lock_state().apply(event);
            for action in actions {
                self.perform(action, &transport).await;
            }
        }
        tracing::debug!(instance = %self.id, "transport event stream ended");
    }

    async fn perform(&self, action: Action, transport: &Arc<F::Transport>) {
        match action {
            Action::SendGreeting => {
                tracing::info!(instance = %self.id, "connection open");
                let transport = Arc::clone(transport);
                let instance_id = self.id.clone();
                // At most once per connection; a failed greeting is
                // logged, never retried.
                tokio::spawn(async move {
                    let Some(address) = transport.self_address() else {
                        tracing::warn!(instance = %instance_id, "own address unknown, greeting skipped");
                        return;
                    };
                    let body = greeting_body(&instance_id, Utc::now());
                    if let Err(err) = transport.send_text(&address, &body).await {
                        tracing::warn!(instance = %instance_id, error = %err, "greeting send failed");
                    }
                });
            }
            Action::PersistCredentials(records) => {
                if let Err(err) = self.credentials.persist(&self.id, &records).await {
                    tracing::warn!(instance = %self.id, error = %err, "credential persist failed");
                }
            }
            Action::WipeCredentialsAndReconnect => {
                // Corrupted local credential state: wipe before retrying,
                // with a longer delay if even the wipe fails.
                let delay = match self.credentials.wipe(&self.id).await {
                    Ok(()) => TRANSIENT_RECONNECT_DELAY,
                    Err(err) => {
                        tracing::warn!(instance = %self.id, error = %err, "credential wipe failed");
                        WIPE_FAILED_RECONNECT_DELAY
                    }
                };
                tracing::info!(instance = %self.id, delay_secs = delay.as_secs(), "reconnecting after transient failure");
                let guard = self.link.lock().await.reconnect_guard.clone();
                self.schedule_reconnect(delay, guard);
            }
            Action::ScheduleReconnect => {
                let delay = self.profile.reconnect_delay;
                tracing::info!(instance = %self.id, delay_secs = delay.as_secs(), "connection closed, reconnecting");
                let guard = self.link.lock().await.reconnect_guard.clone();
                self.schedule_reconnect(delay, guard);
            }
            Action::RelayInbound(event) => {
                let messages = normalize::normalize_event(&event, transport.as_ref()).await;
                for message in messages {
                    if self.relay_tx.try_send(message).is_err() {
                        tracing::warn!(instance = %self.id, "relay queue full, dropping message");
                    }
                }
            }
        }
    }

    fn schedule_reconnect(&self, delay: std::time::Duration, guard: CancellationToken) {
        let Some(session) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::select! {
                _ = guard.cancelled() => {
                    tracing::debug!(instance = %session.id, "reconnect timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    session.connect().await;
                }
            }
        });
    }

    /// Tear the connection down. Attempts a graceful logout when the
    /// session is open; any failure there is swallowed because the
    /// transport may already be half-closed. Never fails.
    pub async fn disconnect(&self) -> StatusSnapshot {
        let was_open = self.connection_state() == ConnectionState::Open;
        let transport = {
            let mut link = self.link.lock().await;
            let transport = link.transport.clone();
            link.retire();
            transport
        };

        if was_open {
            if let Some(transport) = transport {
                if let Err(err) = transport.logout().await {
                    tracing::warn!(instance = %self.id, error = %err, "logout failed (connection already closed)");
                }
            }
        }

        self.lock_state().reset();
        tracing::info!(instance = %self.id, "disconnected");
        self.snapshot()
    }

    /// Unconditional reset: release the transport, force `disconnected`,
    /// and delete the persisted credentials. Deletion failure is logged
    /// but never prevents the state reset.
    pub async fn clear_session(&self) -> StatusSnapshot {
        {
            let mut link = self.link.lock().await;
            link.retire();
        }
        self.lock_state().reset();

        if let Err(err) = self.credentials.wipe(&self.id).await {
            tracing::warn!(instance = %self.id, error = %err, "credential delete failed during clear");
        } else {
            tracing::info!(instance = %self.id, "session cleared, credentials deleted");
        }
        self.snapshot()
    }

    /// Full reset-and-reconnect: `clear_session`, a short fixed pause,
    /// then `connect`.
    pub async fn restart(&self) -> StatusSnapshot {
        self.clear_session().await;
        tokio::time::sleep(RESTART_PAUSE).await;
        self.connect().await
    }

    /// Send a text message through the open connection.
    pub async fn send_message(&self, address: &str, body: &str) -> Result<SendReceipt, SessionError> {
        let transport = {
            let link = self.link.lock().await;
            if self.connection_state() != ConnectionState::Open {
                return Err(SessionError::NotConnected);
            }
            link.transport.clone().ok_or(SessionError::NotConnected)?
        };

        let to = jid::normalize_address(address);
        transport
            .send_text(&to, body)
            .await
            .map_err(|err| SessionError::SendFailed(err.to_string()))?;

        Ok(SendReceipt {
            to,
            content: body.to_string(),
            timestamp: Utc::now(),
        })
    }
}
