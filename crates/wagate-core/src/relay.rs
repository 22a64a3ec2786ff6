//! Best-effort webhook relay.
//!
//! Delivers canonical message records to a configured HTTP endpoint:
//! exactly one attempt per record, no retry, no queue. A failed delivery
//! is logged with whatever detail the sender captured and never surfaces
//! to the message producer -- the gateway optimizes for not blocking
//! message ingestion over guaranteed delivery.

use std::future::Future;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use wagate_types::error::DeliveryError;
use wagate_types::message::CanonicalMessage;

/// Event name carried in the delivery envelope.
pub const MESSAGE_RECEIVED_EVENT: &str = "message.received";

/// Envelope POSTed to the webhook endpoint.
#[derive(Debug, Serialize)]
pub struct WebhookEnvelope<'a> {
    pub event: &'a str,
    pub data: &'a CanonicalMessage,
}

/// Performs one outbound POST of an envelope, with a bounded timeout.
pub trait WebhookSender: Send + Sync + 'static {
    fn post(
        &self,
        url: &str,
        envelope: &WebhookEnvelope<'_>,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Mutable, process-lifetime webhook URL slot.
///
/// Clones share the slot. Used both for the registry-wide default target
/// and for per-session overrides; not persisted -- resets on restart.
#[derive(Clone, Default)]
pub struct WebhookTarget {
    url: Arc<RwLock<Option<String>>>,
}

impl WebhookTarget {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            url: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn set(&self, url: impl Into<String>) {
        *self.write() = Some(url.into());
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    pub fn get(&self) -> Option<String> {
        self.url
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<String>> {
        self.url.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookTarget")
            .field("configured", &self.get().is_some())
            .finish()
    }
}

/// Best-effort relay of canonical messages to a webhook endpoint.
///
/// Generic over the [`WebhookSender`] port; the infra layer supplies the
/// HTTP implementation.
pub struct WebhookRelay<S> {
    sender: Arc<S>,
    default_target: WebhookTarget,
}

impl<S> Clone for WebhookRelay<S> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            default_target: self.default_target.clone(),
        }
    }
}

impl<S: WebhookSender> WebhookRelay<S> {
    pub fn new(sender: S, default_target: WebhookTarget) -> Self {
        Self {
            sender: Arc::new(sender),
            default_target,
        }
    }

    /// The registry-wide default target, mutable at runtime via `set_webhook`.
    pub fn default_target(&self) -> &WebhookTarget {
        &self.default_target
    }

    /// Deliver one message: resolve the session override, then the default
    /// target; no-op when neither is configured. At most one attempt.
    pub async fn deliver(&self, session_target: &WebhookTarget, message: &CanonicalMessage) {
        let Some(url) = session_target.get().or_else(|| self.default_target.get()) else {
            tracing::debug!(message_id = %message.id, "no webhook configured, delivery skipped");
            return;
        };

        let envelope = WebhookEnvelope {
            event: MESSAGE_RECEIVED_EVENT,
            data: message,
        };

        match self.sender.post(&url, &envelope).await {
            Ok(()) => {
                tracing::debug!(message_id = %message.id, %url, "webhook delivered");
            }
            Err(err) => {
                // Best-effort: log and move on, never retry or queue.
                tracing::warn!(message_id = %message.id, %url, error = %err, "webhook delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use wagate_types::message::{Direction, MessageKind};

    /// Sender that records every attempt and answers from a script.
    struct RecordingSender {
        attempts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSender {
        fn new(fail: bool) -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn attempt_count(&self) -> usize {
            self.attempts.lock().unwrap().len()
        }
    }

    impl WebhookSender for RecordingSender {
        async fn post(
            &self,
            url: &str,
            envelope: &WebhookEnvelope<'_>,
        ) -> Result<(), DeliveryError> {
            assert_eq!(envelope.event, MESSAGE_RECEIVED_EVENT);
            self.attempts.lock().unwrap().push(url.to_string());
            if self.fail {
                Err(DeliveryError::Timeout)
            } else {
                Ok(())
            }
        }
    }

    fn sample_message() -> CanonicalMessage {
        CanonicalMessage {
            id: "MSG1".to_string(),
            text: "hi".to_string(),
            sender: "100@s.whatsapp.net".to_string(),
            sender_display_name: "Peer".to_string(),
            timestamp: 1_700_000_000,
            direction: Direction::Inbound,
            kind: MessageKind::Text,
            media: None,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_no_url_performs_zero_attempts() {
        let relay = WebhookRelay::new(RecordingSender::new(false), WebhookTarget::default());
        relay.deliver(&WebhookTarget::default(), &sample_message()).await;
        assert_eq!(relay.sender.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_delivery_uses_default_target() {
        let target = WebhookTarget::new(Some("http://hooks.local/wa".to_string()));
        let relay = WebhookRelay::new(RecordingSender::new(false), target);
        relay.deliver(&WebhookTarget::default(), &sample_message()).await;
        assert_eq!(
            *relay.sender.attempts.lock().unwrap(),
            vec!["http://hooks.local/wa".to_string()]
        );
    }

    #[tokio::test]
    async fn test_session_override_wins_over_default() {
        let relay = WebhookRelay::new(
            RecordingSender::new(false),
            WebhookTarget::new(Some("http://default.local".to_string())),
        );
        let session_target = WebhookTarget::new(Some("http://override.local".to_string()));
        relay.deliver(&session_target, &sample_message()).await;
        assert_eq!(
            *relay.sender.attempts.lock().unwrap(),
            vec!["http://override.local".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failures_are_independent_attempts_without_retry() {
        let target = WebhookTarget::new(Some("http://unreachable.local".to_string()));
        let relay = WebhookRelay::new(RecordingSender::new(true), target);

        // Three deliveries against an endpoint that always fails: exactly
        // three attempts, no retries, no queued backlog.
        for _ in 0..3 {
            relay.deliver(&WebhookTarget::default(), &sample_message()).await;
        }
        assert_eq!(relay.sender.attempt_count(), 3);
    }

    #[tokio::test]
    async fn test_target_set_and_clear() {
        let target = WebhookTarget::default();
        assert!(target.get().is_none());
        target.set("http://a.local");
        assert_eq!(target.get().as_deref(), Some("http://a.local"));
        target.clear();
        assert!(target.get().is_none());
    }
}
