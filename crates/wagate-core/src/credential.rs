//! Credential store port.
//!
//! Authentication material is a set of opaque provider records (JSON
//! values) scoped to one instance id. Deleting an instance's namespace is
//! equivalent to forgetting that the device was ever paired.

use std::collections::HashMap;
use std::future::Future;

use wagate_types::error::StoreError;

/// One durable credential record within an instance's namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    pub key: String,
    pub value: serde_json::Value,
}

impl CredentialRecord {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// The full credential set loaded for one instance.
///
/// Empty credentials mean the device has never paired (or was reset);
/// the transport will issue a fresh pairing challenge.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub records: HashMap<String, serde_json::Value>,
}

impl Credentials {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.records.get(key)
    }
}

impl FromIterator<CredentialRecord> for Credentials {
    fn from_iter<I: IntoIterator<Item = CredentialRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|r| (r.key, r.value)).collect(),
        }
    }
}

/// Durable key/value persistence of per-instance authentication material.
pub trait CredentialStore: Send + Sync + 'static {
    /// Load every record in the instance's namespace.
    fn load(
        &self,
        instance_id: &str,
    ) -> impl Future<Output = Result<Credentials, StoreError>> + Send;

    /// Upsert a batch of records into the instance's namespace.
    fn persist(
        &self,
        instance_id: &str,
        records: &[CredentialRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete the instance's entire namespace.
    fn wipe(&self, instance_id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory credential store for tests and ephemeral single-process
/// deployments. Contents do not survive a restart.
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use wagate_types::error::StoreError;

    use super::{CredentialRecord, CredentialStore, Credentials};

    #[derive(Default)]
    pub struct MemoryCredentialStore {
        namespaces: Mutex<HashMap<String, HashMap<String, serde_json::Value>>>,
        fail_wipe: std::sync::atomic::AtomicBool,
    }

    impl MemoryCredentialStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent `wipe` calls fail, to exercise the fallback
        /// reconnect path.
        pub fn fail_wipe(&self, fail: bool) {
            self.fail_wipe.store(fail, std::sync::atomic::Ordering::SeqCst);
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<String, serde_json::Value>>> {
            self.namespaces
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
        }

        /// Whether any record exists for the instance.
        pub fn has_namespace(&self, instance_id: &str) -> bool {
            self.lock().get(instance_id).is_some_and(|ns| !ns.is_empty())
        }
    }

    impl CredentialStore for MemoryCredentialStore {
        async fn load(&self, instance_id: &str) -> Result<Credentials, StoreError> {
            Ok(Credentials {
                records: self.lock().get(instance_id).cloned().unwrap_or_default(),
            })
        }

        async fn persist(
            &self,
            instance_id: &str,
            records: &[CredentialRecord],
        ) -> Result<(), StoreError> {
            let mut namespaces = self.lock();
            let namespace = namespaces.entry(instance_id.to_string()).or_default();
            for record in records {
                namespace.insert(record.key.clone(), record.value.clone());
            }
            Ok(())
        }

        async fn wipe(&self, instance_id: &str) -> Result<(), StoreError> {
            if self.fail_wipe.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::Query("wipe disabled".to_string()));
            }
            self.lock().remove(instance_id);
            Ok(())
        }
    }
}
