//! HTTP webhook sender.
//!
//! Implements `WebhookSender` from `wagate-core` with a reqwest client.
//! One POST per envelope, JSON content type, bounded timeout; non-2xx
//! responses come back as `DeliveryError::Endpoint` with a truncated body
//! so the relay can log useful detail.

use std::time::Duration;

use wagate_core::relay::{WebhookEnvelope, WebhookSender};
use wagate_types::error::DeliveryError;

/// Default hard deadline for one delivery attempt.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// How much of an error response body is kept for logging.
const BODY_DETAIL_LIMIT: usize = 512;

/// reqwest-backed implementation of `WebhookSender`.
pub struct HttpWebhookSender {
    client: reqwest::Client,
}

impl HttpWebhookSender {
    /// Create a sender with the given per-attempt timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wagate/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to create reqwest client");
        Self { client }
    }
}

impl Default for HttpWebhookSender {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERY_TIMEOUT)
    }
}

impl WebhookSender for HttpWebhookSender {
    async fn post(&self, url: &str, envelope: &WebhookEnvelope<'_>) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url)
            .json(envelope)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Request(err.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        body.truncate(BODY_DETAIL_LIMIT);
        Err(DeliveryError::Endpoint {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wagate_core::relay::MESSAGE_RECEIVED_EVENT;
    use wagate_types::message::{CanonicalMessage, Direction, MessageKind};

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

    /// Accept one connection, read the full request (headers plus
    /// content-length body), answer with a canned response. Returns the
    /// request bytes.
    async fn one_shot_server(listener: TcpListener, response: &'static str) -> Vec<u8> {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before request completed");
            request.extend_from_slice(&buf[..n]);

            let Some(header_end) = request
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .map(|p| p + 4)
            else {
                continue;
            };
            let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= header_end + content_length {
                break;
            }
        }

        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        request
    }

    #[tokio::test]
    async fn test_successful_delivery() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let server = tokio::spawn(one_shot_server(
            listener,
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n",
        ));

        let sender = HttpWebhookSender::default();
        let message = sample_message();
        let envelope = WebhookEnvelope {
            event: MESSAGE_RECEIVED_EVENT,
            data: &message,
        };
        sender.post(&url, &envelope).await.unwrap();

        let request = String::from_utf8(server.await.unwrap()).unwrap();
        assert!(request.starts_with("POST /hook"));
        assert!(request.contains("content-type: application/json"));
        assert!(request.contains("\"event\":\"message.received\""));
        assert!(request.contains("\"senderName\":\"Peer\""));
    }

    #[tokio::test]
    async fn test_non_2xx_reports_status_and_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let server = tokio::spawn(one_shot_server(
            listener,
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 10\r\n\r\noverloaded",
        ));

        let sender = HttpWebhookSender::default();
        let message = sample_message();
        let envelope = WebhookEnvelope {
            event: MESSAGE_RECEIVED_EVENT,
            data: &message,
        };
        let err = sender.post(&url, &envelope).await.unwrap_err();
        match err {
            DeliveryError::Endpoint { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        drop(listener);

        let sender = HttpWebhookSender::default();
        let message = sample_message();
        let envelope = WebhookEnvelope {
            event: MESSAGE_RECEIVED_EVENT,
            data: &message,
        };
        let err = sender.post(&url, &envelope).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Request(_)));
    }
}
