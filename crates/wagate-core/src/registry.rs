//! Instance registry: instance id -> session.
//!
//! Supports concurrent `get`/`create`/`remove` from multiple in-flight
//! requests. Creation goes through the DashMap entry API so two racing
//! `create` calls for the same id resolve deterministically: the second
//! observes `AlreadyExists`, never a torn intermediate state.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use wagate_types::error::SessionError;
use wagate_types::session::{ConnectionState, SessionSummary};

use crate::credential::CredentialStore;
use crate::relay::WebhookSender;
use crate::session::Session;
use crate::transport::TransportFactory;

/// Concurrent mapping of instance id to session.
pub struct InstanceRegistry<F, C, S>
where
    F: TransportFactory,
    C: CredentialStore,
    S: WebhookSender,
{
    sessions: DashMap<String, Arc<Session<F, C, S>>>,
}

impl<F, C, S> InstanceRegistry<F, C, S>
where
    F: TransportFactory,
    C: CredentialStore,
    S: WebhookSender,
{
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a freshly built session under its id.
    ///
    /// Fails with `AlreadyExists` when a session with this id is present
    /// in any state other than `disconnected`; a disconnected entry is
    /// replaced.
    pub fn register(
        &self,
        session: Arc<Session<F, C, S>>,
    ) -> Result<Arc<Session<F, C, S>>, SessionError> {
        let id = session.id().to_string();
        match self.sessions.entry(id.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().connection_state() != ConnectionState::Disconnected {
                    return Err(SessionError::AlreadyExists(id));
                }
                occupied.insert(Arc::clone(&session));
                Ok(session)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&session));
                Ok(session)
            }
        }
    }

    /// Fetch the session for an id, or the one built by `build` when the
    /// id is unknown. Two racing callers observe the same session.
    pub fn get_or_insert_with(
        &self,
        id: &str,
        build: impl FnOnce() -> Arc<Session<F, C, S>>,
    ) -> Arc<Session<F, C, S>> {
        Arc::clone(&self.sessions.entry(id.to_string()).or_insert_with(build))
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session<F, C, S>>, SessionError> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::NotFound)
    }

    /// Remove the registry entry, returning the evicted session (if any)
    /// so the caller can tear it down.
    pub fn remove(&self, id: &str) -> Option<Arc<Session<F, C, S>>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Fresh snapshot of per-session summaries. Ordering is stable within
    /// one call but otherwise unspecified.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .map(|entry| entry.value().summary())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<F, C, S> Default for InstanceRegistry<F, C, S>
where
    F: TransportFactory,
    C: CredentialStore,
    S: WebhookSender,
{
    fn default() -> Self {
        Self::new()
    }
}
