//! Operation facade.
//!
//! The public contract the thin HTTP layer invokes. Coordinates the
//! instance registry, credential store, transport factory, and webhook
//! relay. Constructed explicitly at startup and passed to the API layer;
//! there is no process-global state.

use std::sync::Arc;

use chrono::Utc;

use wagate_types::error::SessionError;
use wagate_types::message::{CanonicalMessage, Direction, MessageKind};
use wagate_types::session::{
    DEFAULT_INSTANCE_ID, SendReceipt, SessionSummary, StatusSnapshot,
};

use crate::credential::CredentialStore;
use crate::registry::InstanceRegistry;
use crate::relay::{WebhookRelay, WebhookSender, WebhookTarget};
use crate::session::{ConnectionProfile, Session};
use crate::transport::TransportFactory;

/// The gateway's operation facade.
///
/// Generic over the three ports; the API layer pins them to concrete
/// infrastructure implementations.
pub struct Gateway<F, C, S>
where
    F: TransportFactory,
    C: CredentialStore,
    S: WebhookSender,
{
    registry: InstanceRegistry<F, C, S>,
    factory: Arc<F>,
    credentials: Arc<C>,
    relay: WebhookRelay<S>,
}

impl<F, C, S> Gateway<F, C, S>
where
    F: TransportFactory,
    C: CredentialStore,
    S: WebhookSender,
{
    pub fn new(factory: Arc<F>, credentials: Arc<C>, relay: WebhookRelay<S>) -> Self {
        Self {
            registry: InstanceRegistry::new(),
            factory,
            credentials,
            relay,
        }
    }

    fn resolve_id<'a>(&self, id: Option<&'a str>) -> &'a str {
        id.unwrap_or(DEFAULT_INSTANCE_ID)
    }

    fn build_session(
        &self,
        id: &str,
        phone_number: Option<String>,
        profile: ConnectionProfile,
    ) -> Arc<Session<F, C, S>> {
        Session::new(
            id,
            phone_number,
            profile,
            Arc::clone(&self.factory),
            Arc::clone(&self.credentials),
            self.relay.clone(),
        )
    }

    /// Start a connection for the instance (creating the session on first
    /// use) under the standard profile.
    pub async fn connect(&self, id: Option<&str>) -> StatusSnapshot {
        self.connect_with_profile(id, ConnectionProfile::standard()).await
    }

    /// Start a connection under an explicit profile. The profile is fixed
    /// for the lifetime of the session.
    pub async fn connect_with_profile(
        &self,
        id: Option<&str>,
        profile: ConnectionProfile,
    ) -> StatusSnapshot {
        let id = self.resolve_id(id);
        let session = self
            .registry
            .get_or_insert_with(id, || self.build_session(id, None, profile));
        session.connect().await
    }

    /// Explicitly create and connect a new instance. Fails with
    /// `AlreadyExists` when the id is taken by a non-disconnected session.
    pub async fn create_instance(
        &self,
        id: &str,
        phone_number: Option<String>,
    ) -> Result<StatusSnapshot, SessionError> {
        let session = self.build_session(id, phone_number, ConnectionProfile::standard());
        let session = self.registry.register(session)?;
        Ok(session.connect().await)
    }

    /// Tear down the instance's connection. Always reports success, even
    /// when the underlying teardown stumbles; an unknown id is already
    /// disconnected by definition.
    pub async fn disconnect(&self, id: Option<&str>) -> StatusSnapshot {
        match self.registry.get(self.resolve_id(id)) {
            Ok(session) => session.disconnect().await,
            Err(_) => StatusSnapshot {
                connection_state: wagate_types::session::ConnectionState::Disconnected,
                has_qr_challenge: false,
            },
        }
    }

    /// Nuclear reset: force-disconnect and delete persisted credentials.
    /// Always reports success.
    pub async fn clear_session(&self, id: Option<&str>) -> StatusSnapshot {
        match self.registry.get(self.resolve_id(id)) {
            Ok(session) => session.clear_session().await,
            Err(_) => StatusSnapshot {
                connection_state: wagate_types::session::ConnectionState::Disconnected,
                has_qr_challenge: false,
            },
        }
    }

    /// `clear_session`, a short pause, then `connect`.
    pub async fn restart(&self, id: Option<&str>) -> StatusSnapshot {
        let id = self.resolve_id(id);
        let session = self.registry.get_or_insert_with(id, || {
            self.build_session(id, None, ConnectionProfile::standard())
        });
        session.restart().await
    }

    /// Current pairing challenge, or `None` when not available.
    pub fn get_qr(&self, id: Option<&str>) -> Result<Option<String>, SessionError> {
        Ok(self.registry.get(self.resolve_id(id))?.qr_challenge())
    }

    pub fn get_status(&self, id: Option<&str>) -> Result<StatusSnapshot, SessionError> {
        Ok(self.registry.get(self.resolve_id(id))?.snapshot())
    }

    /// Send a text message through an open session.
    pub async fn send_message(
        &self,
        id: Option<&str>,
        address: &str,
        text: &str,
    ) -> Result<SendReceipt, SessionError> {
        let session = self.registry.get(self.resolve_id(id))?;
        session.send_message(address, text).await
    }

    /// Remove an instance: tear it down via `disconnect`, then delete the
    /// registry entry.
    pub async fn remove_instance(&self, id: &str) -> Result<(), SessionError> {
        let session = self.registry.remove(id).ok_or(SessionError::NotFound)?;
        session.disconnect().await;
        Ok(())
    }

    /// Set the registry-wide default webhook URL.
    pub fn set_webhook(&self, url: &str) {
        self.relay.default_target().set(url);
        tracing::info!(%url, "webhook configured");
    }

    pub fn webhook_url(&self) -> Option<String> {
        self.relay.default_target().get()
    }

    /// Set a per-session webhook override.
    pub fn set_instance_webhook(&self, id: &str, url: &str) -> Result<(), SessionError> {
        let session = self.registry.get(id)?;
        session.webhook_override().set(url);
        tracing::info!(instance = %id, %url, "instance webhook configured");
        Ok(())
    }

    pub fn list_instances(&self) -> Vec<SessionSummary> {
        self.registry.list()
    }

    /// Push a synthetic record through the relay to verify the configured
    /// endpoint end to end.
    pub async fn send_test_webhook(&self) -> CanonicalMessage {
        let message = CanonicalMessage {
            id: "TEST_MESSAGE_ID".to_string(),
            text: "Test message from the gateway".to_string(),
            sender: format!("5551234{}", crate::jid::NETWORK_SUFFIX),
            sender_display_name: "Test User".to_string(),
            timestamp: Utc::now().timestamp(),
            direction: Direction::Inbound,
            kind: MessageKind::Text,
            media: None,
            received_at: Utc::now(),
        };
        self.relay.deliver(&WebhookTarget::default(), &message).await;
        message
    }
}
