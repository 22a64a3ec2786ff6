//! Inbound message normalization.
//!
//! Converts raw inbound events of varying payload shape into canonical
//! message records. Policy, in order:
//!
//! 1. Zero-message events are a no-op.
//! 2. The account's own echoes (`from_me`) are skipped before anything
//!    else -- in particular before any media download is attempted.
//! 3. Group-sourced senders are rewritten to the canonical participant
//!    address; direct senders pass through unchanged.
//! 4. Unsupported payload variants are skipped entirely.
//! 5. Media payloads are materialized best-effort: a failed download
//!    yields a record with `media.error` set and a placeholder text, and
//!    the record is still forwarded.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;

use wagate_types::message::{CanonicalMessage, Direction, MediaContent, MessageKind};

use crate::jid;
use crate::transport::{MediaRef, RawInboundEvent, RawMessage, RawPayload, Transport};

/// Hard deadline for one media download; on expiry the record is forwarded
/// with `media.error` set.
const MEDIA_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Normalize every message in a raw inbound event, preserving order.
pub async fn normalize_event<T: Transport>(
    event: &RawInboundEvent,
    transport: &T,
) -> Vec<CanonicalMessage> {
    let mut out = Vec::with_capacity(event.messages.len());
    for raw in &event.messages {
        if let Some(message) = normalize_message(raw, transport).await {
            out.push(message);
        }
    }
    out
}

/// Normalize one raw message, or skip it (own echo, unsupported payload).
pub async fn normalize_message<T: Transport>(
    raw: &RawMessage,
    transport: &T,
) -> Option<CanonicalMessage> {
    // Own echoes are discarded before type detection, so no download cost
    // is ever paid for them.
    if raw.from_me {
        tracing::debug!(message_id = %raw.id, "skipping own echo");
        return None;
    }

    let sender = resolve_sender(&raw.chat, raw.participant.as_deref());
    let sender_display_name = raw
        .sender_display_name
        .clone()
        .unwrap_or_else(|| "Unknown".to_string());

    let (kind, text, media) = match &raw.payload {
        RawPayload::Text { body } => (MessageKind::Text, body.clone(), None),
        RawPayload::Image { caption, media } => {
            let kind = MessageKind::Image;
            let content = fetch_media(transport, media, kind, None).await;
            let text = caption.clone().unwrap_or_else(|| kind.placeholder().to_string());
            (kind, text, Some(content))
        }
        RawPayload::Audio {
            media,
            duration_seconds,
            is_voice_note,
        } => {
            let kind = MessageKind::Audio;
            let content = fetch_media(transport, media, kind, None)
                .await
                .with_audio(*duration_seconds, *is_voice_note);
            (kind, kind.placeholder().to_string(), Some(content))
        }
        RawPayload::Video { caption, media } => {
            let kind = MessageKind::Video;
            let content = fetch_media(transport, media, kind, None).await;
            let text = caption.clone().unwrap_or_else(|| kind.placeholder().to_string());
            (kind, text, Some(content))
        }
        RawPayload::Document { media, file_name } => {
            let kind = MessageKind::Document;
            let content = fetch_media(transport, media, kind, file_name.as_deref()).await;
            (kind, kind.placeholder().to_string(), Some(content))
        }
        RawPayload::Unsupported => {
            tracing::debug!(message_id = %raw.id, "skipping unsupported payload variant");
            return None;
        }
    };

    Some(CanonicalMessage {
        id: raw.id.clone(),
        text,
        sender,
        sender_display_name,
        timestamp: raw.timestamp,
        direction: Direction::Inbound,
        kind,
        media,
        received_at: Utc::now(),
    })
}

/// Resolve the canonical sender address: group participants are rewritten
/// to the standard suffix, direct conversation addresses pass through.
pub fn resolve_sender(chat: &str, participant: Option<&str>) -> String {
    match participant {
        Some(p) => jid::canonical_participant(p),
        None => chat.to_string(),
    }
}

/// Materialize a media payload with a hard download deadline.
async fn fetch_media<T: Transport>(
    transport: &T,
    media: &MediaRef,
    kind: MessageKind,
    file_name: Option<&str>,
) -> MediaContent {
    let file_name = file_name
        .unwrap_or_else(|| kind.default_file_name())
        .to_string();

    let download = tokio::time::timeout(MEDIA_DOWNLOAD_TIMEOUT, transport.download_media(media));
    match download.await {
        Ok(Ok(bytes)) => {
            let size = bytes.len() as u64;
            MediaContent::fetched(media.mime_type.clone(), file_name, size, BASE64.encode(bytes))
        }
        Ok(Err(err)) => {
            tracing::warn!(handle = %media.handle, error = %err, "media download failed");
            MediaContent::failed(
                media.mime_type.clone(),
                file_name,
                media.size_bytes,
                err.to_string(),
            )
        }
        Err(_) => {
            tracing::warn!(handle = %media.handle, "media download timed out");
            MediaContent::failed(
                media.mime_type.clone(),
                file_name,
                media.size_bytes,
                "download timed out".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credentials;
    use crate::session::profile::ConnectionProfile;
    use crate::transport::TransportFactory;
    use crate::transport::channel::{ChannelTransport, ChannelTransportFactory, TransportController};

    async fn test_transport() -> (ChannelTransport, TransportController) {
        let factory = ChannelTransportFactory::new();
        let (transport, _rx) = factory
            .connect("norm", Credentials::empty(), &ConnectionProfile::standard())
            .await
            .unwrap();
        let controller = factory.controller("norm").unwrap();
        (transport, controller)
    }

    fn raw(payload: RawPayload) -> RawMessage {
        RawMessage {
            id: "MSG1".to_string(),
            chat: "5551234@s.whatsapp.net".to_string(),
            participant: None,
            sender_display_name: Some("Ada".to_string()),
            timestamp: 1_700_000_000,
            from_me: false,
            payload,
        }
    }

    fn media_ref(handle: &str) -> MediaRef {
        MediaRef {
            handle: handle.to_string(),
            mime_type: "application/octet-stream".to_string(),
            size_bytes: 64,
        }
    }

    #[tokio::test]
    async fn test_text_message_normalizes() {
        let (transport, _c) = test_transport().await;
        let message = normalize_message(
            &raw(RawPayload::Text {
                body: "hello there".to_string(),
            }),
            &transport,
        )
        .await
        .unwrap();

        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(message.text, "hello there");
        assert_eq!(message.sender, "5551234@s.whatsapp.net");
        assert_eq!(message.sender_display_name, "Ada");
        assert_eq!(message.direction, Direction::Inbound);
        assert!(message.media.is_none());
    }

    #[tokio::test]
    async fn test_outbound_skipped_for_every_kind() {
        let (transport, controller) = test_transport().await;
        controller.put_media("m", vec![0u8; 8]);

        let payloads = vec![
            RawPayload::Text {
                body: "x".to_string(),
            },
            RawPayload::Image {
                caption: None,
                media: media_ref("m"),
            },
            RawPayload::Audio {
                media: media_ref("m"),
                duration_seconds: Some(2),
                is_voice_note: true,
            },
            RawPayload::Video {
                caption: None,
                media: media_ref("m"),
            },
            RawPayload::Document {
                media: media_ref("m"),
                file_name: None,
            },
        ];

        for payload in payloads {
            let mut message = raw(payload);
            message.from_me = true;
            assert!(normalize_message(&message, &transport).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_group_participant_rewritten() {
        let (transport, _c) = test_transport().await;
        let mut message = raw(RawPayload::Text {
            body: "from a group".to_string(),
        });
        message.chat = "group-42@g.us".to_string();
        message.participant = Some("1234@lid".to_string());

        let normalized = normalize_message(&message, &transport).await.unwrap();
        assert_eq!(normalized.sender, "1234@s.whatsapp.net");
    }

    #[tokio::test]
    async fn test_missing_display_name_defaults_to_unknown() {
        let (transport, _c) = test_transport().await;
        let mut message = raw(RawPayload::Text {
            body: "anon".to_string(),
        });
        message.sender_display_name = None;

        let normalized = normalize_message(&message, &transport).await.unwrap();
        assert_eq!(normalized.sender_display_name, "Unknown");
    }

    #[tokio::test]
    async fn test_unsupported_payload_skipped() {
        let (transport, _c) = test_transport().await;
        assert!(
            normalize_message(&raw(RawPayload::Unsupported), &transport)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_image_with_caption_keeps_caption() {
        let (transport, controller) = test_transport().await;
        controller.put_media("img", b"jpegbytes".to_vec());

        let normalized = normalize_message(
            &raw(RawPayload::Image {
                caption: Some("look at this".to_string()),
                media: media_ref("img"),
            }),
            &transport,
        )
        .await
        .unwrap();

        assert_eq!(normalized.kind, MessageKind::Image);
        assert_eq!(normalized.text, "look at this");
        let media = normalized.media.unwrap();
        assert_eq!(media.payload.as_deref(), Some(BASE64.encode(b"jpegbytes").as_str()));
        assert_eq!(media.file_size_bytes, 9);
        assert_eq!(media.file_name, "image.jpg");
        assert!(media.error.is_none());
    }

    #[tokio::test]
    async fn test_audio_download_failure_still_forwarded() {
        let (transport, _c) = test_transport().await;
        // Handle never staged -> download fails.
        let normalized = normalize_message(
            &raw(RawPayload::Audio {
                media: media_ref("missing"),
                duration_seconds: Some(5),
                is_voice_note: true,
            }),
            &transport,
        )
        .await
        .unwrap();

        assert_eq!(normalized.kind, MessageKind::Audio);
        assert_eq!(normalized.text, "[Voice note]");
        let media = normalized.media.unwrap();
        assert!(media.payload.is_none());
        assert!(media.error.is_some());
        assert_eq!(media.duration_seconds, Some(5));
        assert_eq!(media.is_voice_note, Some(true));
    }

    #[tokio::test]
    async fn test_document_file_name_fallback() {
        let (transport, controller) = test_transport().await;
        controller.put_media("doc", vec![1]);

        let named = normalize_message(
            &raw(RawPayload::Document {
                media: media_ref("doc"),
                file_name: Some("report.pdf".to_string()),
            }),
            &transport,
        )
        .await
        .unwrap();
        assert_eq!(named.media.unwrap().file_name, "report.pdf");
        assert_eq!(named.text, "[Document]");

        let unnamed = normalize_message(
            &raw(RawPayload::Document {
                media: media_ref("doc"),
                file_name: None,
            }),
            &transport,
        )
        .await
        .unwrap();
        assert_eq!(unnamed.media.unwrap().file_name, "document.bin");
    }

    #[tokio::test]
    async fn test_zero_message_event_is_noop() {
        let (transport, _c) = test_transport().await;
        let out = normalize_event(&RawInboundEvent::default(), &transport).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_event_order_preserved() {
        let (transport, _c) = test_transport().await;
        let event = RawInboundEvent {
            messages: vec![
                RawMessage {
                    id: "A".to_string(),
                    ..raw(RawPayload::Text { body: "first".to_string() })
                },
                RawMessage {
                    id: "B".to_string(),
                    ..raw(RawPayload::Text { body: "second".to_string() })
                },
            ],
        };
        let out = normalize_event(&event, &transport).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "A");
        assert_eq!(out[1].id, "B");
    }
}
