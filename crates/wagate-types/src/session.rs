//! Session and connection-state types for wagate.
//!
//! A session is one logical chat-account connection against the messaging
//! network, independently lifecycled and addressed by an opaque instance id.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Instance id used by the single-session API surface.
pub const DEFAULT_INSTANCE_ID: &str = "default";

/// Connection state of a session's transport.
///
/// Transitions: `disconnected -> connecting -> open`, and
/// `open|connecting -> closed -> (disconnected | connecting)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for ConnectionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disconnected" => Ok(ConnectionState::Disconnected),
            "connecting" => Ok(ConnectionState::Connecting),
            "open" => Ok(ConnectionState::Open),
            "closed" => Ok(ConnectionState::Closed),
            other => Err(format!("invalid connection state: '{other}'")),
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

/// Why the transport reported a closed connection.
///
/// Closures are not homogeneous: some are terminal and need human
/// re-pairing, some are transient network blips, and some indicate
/// corrupted local credential state that must be wiped before retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The account was explicitly logged out on the remote side. Terminal;
    /// the device must be re-paired.
    LoggedOut,
    /// A generic connection failure that points at corrupted local
    /// credential state.
    TransientFailure(String),
    /// Any other closure (network blip, server restart, ...).
    Other(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::LoggedOut => write!(f, "logged out"),
            CloseReason::TransientFailure(detail) => write!(f, "connection failure: {detail}"),
            CloseReason::Other(detail) => write!(f, "closed: {detail}"),
        }
    }
}

/// Point-in-time view of one session's connection, as reported by
/// `get_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub connection_state: ConnectionState,
    pub has_qr_challenge: bool,
}

/// Per-session summary row produced by `list_instances`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub connection_state: ConnectionState,
    pub has_qr_challenge: bool,
}

/// Echo returned by a successful outbound send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub to: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_roundtrip() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closed,
        ] {
            let rendered = state.to_string();
            assert_eq!(rendered.parse::<ConnectionState>().unwrap(), state);
        }
    }

    #[test]
    fn test_connection_state_invalid() {
        assert!("bogus".parse::<ConnectionState>().is_err());
    }

    #[test]
    fn test_connection_state_serde_lowercase() {
        let json = serde_json::to_string(&ConnectionState::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::LoggedOut.to_string(), "logged out");
        let transient = CloseReason::TransientFailure("stream errored".to_string());
        assert!(transient.to_string().contains("stream errored"));
    }

    #[test]
    fn test_status_snapshot_wire_names() {
        let snapshot = StatusSnapshot {
            connection_state: ConnectionState::Open,
            has_qr_challenge: false,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["connectionState"], "open");
        assert_eq!(json["hasQrChallenge"], false);
    }
}
