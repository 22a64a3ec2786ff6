//! Canonical message schema.
//!
//! Inbound events arrive from the wire in a handful of payload shapes
//! (text, image, audio, video, document). The normalizer flattens all of
//! them into [`CanonicalMessage`], the schema-stable record handed to the
//! webhook relay. Wire names are camelCase to match the webhook consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

/// Whether a message was sent by the account itself or received from a peer.
///
/// Only `inbound` messages are relayed; the account's own echoes are
/// skipped before any media download is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Payload classification of a canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
}

impl MessageKind {
    /// Bracketed placeholder used as `text` when a media message carries
    /// no caption, or when its payload could not be retrieved.
    pub fn placeholder(&self) -> &'static str {
        match self {
            MessageKind::Text => "",
            MessageKind::Image => "[Image]",
            MessageKind::Audio => "[Voice note]",
            MessageKind::Video => "[Video]",
            MessageKind::Document => "[Document]",
        }
    }

    /// Default file name used when the provider supplies none.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            MessageKind::Text => "message.txt",
            MessageKind::Image => "image.jpg",
            MessageKind::Audio => "audio.ogg",
            MessageKind::Video => "video.mp4",
            MessageKind::Document => "document.bin",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Text => write!(f, "text"),
            MessageKind::Image => write!(f, "image"),
            MessageKind::Audio => write!(f, "audio"),
            MessageKind::Video => write!(f, "video"),
            MessageKind::Document => write!(f, "document"),
        }
    }
}

/// Media attachment of a canonical message.
///
/// Exactly one of `payload` / `error` is populated for any record where a
/// download was attempted; use [`MediaContent::fetched`] and
/// [`MediaContent::failed`] to keep that invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContent {
    pub mime_type: String,
    pub file_name: String,
    pub file_size_bytes: u64,
    /// Base64-encoded media bytes, when the download succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Short reason the payload could not be retrieved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Audio only: play length in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// Audio only: push-to-talk voice note vs. attached audio file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_voice_note: Option<bool>,
}

impl MediaContent {
    /// Media record for a successful download.
    pub fn fetched(mime_type: String, file_name: String, file_size_bytes: u64, payload: String) -> Self {
        Self {
            mime_type,
            file_name,
            file_size_bytes,
            payload: Some(payload),
            error: None,
            duration_seconds: None,
            is_voice_note: None,
        }
    }

    /// Media record for a failed download. The event is still forwarded.
    pub fn failed(mime_type: String, file_name: String, file_size_bytes: u64, reason: String) -> Self {
        Self {
            mime_type,
            file_name,
            file_size_bytes,
            payload: None,
            error: Some(reason),
            duration_seconds: None,
            is_voice_note: None,
        }
    }

    /// Attach audio-specific fields.
    pub fn with_audio(mut self, duration_seconds: Option<u32>, is_voice_note: bool) -> Self {
        self.duration_seconds = duration_seconds;
        self.is_voice_note = Some(is_voice_note);
        self
    }
}

/// The normalized, schema-stable representation of one inbound chat event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMessage {
    /// Provider-assigned message identifier.
    pub id: String,
    /// Best-effort textual representation; caption or bracketed
    /// placeholder for media messages.
    pub text: String,
    /// Canonical sender address. For group messages this is the resolved
    /// participant address, never the group address.
    pub sender: String,
    #[serde(rename = "senderName")]
    pub sender_display_name: String,
    /// Provider-supplied epoch seconds of the original message.
    pub timestamp: i64,
    pub direction: Direction,
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaContent>,
    /// Local processing timestamp, distinct from the provider timestamp.
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> CanonicalMessage {
        CanonicalMessage {
            id: "ABC123".to_string(),
            text: "hello".to_string(),
            sender: "5551234@s.whatsapp.net".to_string(),
            sender_display_name: "Ada".to_string(),
            timestamp: 1_700_000_000,
            direction: Direction::Inbound,
            kind: MessageKind::Text,
            media: None,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(MessageKind::Image.placeholder(), "[Image]");
        assert_eq!(MessageKind::Audio.placeholder(), "[Voice note]");
        assert_eq!(MessageKind::Video.placeholder(), "[Video]");
        assert_eq!(MessageKind::Document.placeholder(), "[Document]");
    }

    #[test]
    fn test_media_fetched_invariant() {
        let media = MediaContent::fetched(
            "image/jpeg".to_string(),
            "photo.jpg".to_string(),
            2048,
            "aGVsbG8=".to_string(),
        );
        assert!(media.payload.is_some());
        assert!(media.error.is_none());
    }

    #[test]
    fn test_media_failed_invariant() {
        let media = MediaContent::failed(
            "audio/ogg".to_string(),
            "audio.ogg".to_string(),
            1024,
            "download timed out".to_string(),
        );
        assert!(media.payload.is_none());
        assert_eq!(media.error.as_deref(), Some("download timed out"));
    }

    #[test]
    fn test_media_audio_fields() {
        let media = MediaContent::fetched(
            "audio/ogg".to_string(),
            "audio.ogg".to_string(),
            1024,
            "UklGRg==".to_string(),
        )
        .with_audio(Some(5), true);
        assert_eq!(media.duration_seconds, Some(5));
        assert_eq!(media.is_voice_note, Some(true));
    }

    #[test]
    fn test_canonical_message_wire_names() {
        let json = serde_json::to_value(&sample_message()).unwrap();
        assert_eq!(json["senderName"], "Ada");
        assert_eq!(json["direction"], "inbound");
        assert_eq!(json["kind"], "text");
        assert!(json.get("receivedAt").is_some());
        // No media -> key omitted entirely
        assert!(json.get("media").is_none());
    }

    #[test]
    fn test_media_wire_names() {
        let media = MediaContent::failed(
            "video/mp4".to_string(),
            "clip.mp4".to_string(),
            99,
            "unreachable".to_string(),
        );
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["mimeType"], "video/mp4");
        assert_eq!(json["fileSizeBytes"], 99);
        assert!(json.get("payload").is_none());
    }
}
