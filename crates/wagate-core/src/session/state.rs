//! Pure connection state machine.
//!
//! [`SessionState::apply`] consumes one transport event and returns the
//! side effects the runner must perform. Keeping the transitions free of
//! IO makes the reconnect classification -- the crux of the design --
//! directly testable.

use wagate_types::session::{CloseReason, ConnectionState, StatusSnapshot};

use crate::credential::CredentialRecord;
use crate::transport::{RawInboundEvent, TransportEvent};

/// Side effect requested by a state transition.
#[derive(Debug)]
pub enum Action {
    /// Dispatch the at-most-once connection greeting.
    SendGreeting,
    /// Persist rotated credential records.
    PersistCredentials(Vec<CredentialRecord>),
    /// Wipe credentials, then schedule a full reconnect (transient-failure
    /// path: short delay, longer fallback if the wipe fails).
    WipeCredentialsAndReconnect,
    /// Schedule a reconnect after the profile's standard delay.
    ScheduleReconnect,
    /// Normalize and relay a batch of inbound messages.
    RelayInbound(RawInboundEvent),
}

/// Mutable state of one session's connection.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub connection_state: ConnectionState,
    /// Present only while pairing is incomplete; cleared on `open` and on
    /// every teardown.
    pub qr_challenge: Option<String>,
    /// Idempotence guard: the greeting fires at most once per successful
    /// connection establishment.
    pub welcome_sent: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a connect attempt has started.
    pub fn begin_connect(&mut self) {
        self.connection_state = ConnectionState::Connecting;
        self.qr_challenge = None;
    }

    /// Force the session back to a cold `disconnected` state.
    pub fn reset(&mut self) {
        self.connection_state = ConnectionState::Disconnected;
        self.qr_challenge = None;
        self.welcome_sent = false;
    }

    /// Apply one transport event, returning the actions to perform.
    pub fn apply(&mut self, event: TransportEvent) -> Vec<Action> {
        match event {
            TransportEvent::PairingCodeIssued(challenge) => {
                self.qr_challenge = Some(challenge);
                Vec::new()
            }
            TransportEvent::Opened => {
                self.connection_state = ConnectionState::Open;
                self.qr_challenge = None;
                if self.welcome_sent {
                    Vec::new()
                } else {
                    self.welcome_sent = true;
                    vec![Action::SendGreeting]
                }
            }
            TransportEvent::Closed(reason) => self.apply_closed(reason),
            TransportEvent::CredentialsUpdated(records) => {
                vec![Action::PersistCredentials(records)]
            }
            TransportEvent::Inbound(event) => vec![Action::RelayInbound(event)],
        }
    }

    fn apply_closed(&mut self, reason: CloseReason) -> Vec<Action> {
        self.qr_challenge = None;
        self.welcome_sent = false;
        match reason {
            CloseReason::LoggedOut => {
                // Terminal: the device must be re-paired by a human.
                self.connection_state = ConnectionState::Disconnected;
                Vec::new()
            }
            CloseReason::TransientFailure(_) => {
                self.connection_state = ConnectionState::Closed;
                vec![Action::WipeCredentialsAndReconnect]
            }
            CloseReason::Other(_) => {
                self.connection_state = ConnectionState::Closed;
                vec![Action::ScheduleReconnect]
            }
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            connection_state: self.connection_state,
            has_qr_challenge: self.qr_challenge.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_code_stored_while_connecting() {
        let mut state = SessionState::new();
        state.begin_connect();

        let actions = state.apply(TransportEvent::PairingCodeIssued("QR-1".to_string()));
        assert!(actions.is_empty());
        assert_eq!(state.connection_state, ConnectionState::Connecting);
        assert_eq!(state.qr_challenge.as_deref(), Some("QR-1"));
    }

    #[test]
    fn test_open_clears_challenge_and_greets_once() {
        let mut state = SessionState::new();
        state.begin_connect();
        state.apply(TransportEvent::PairingCodeIssued("QR-1".to_string()));

        let actions = state.apply(TransportEvent::Opened);
        assert!(matches!(actions.as_slice(), [Action::SendGreeting]));
        assert_eq!(state.connection_state, ConnectionState::Open);
        assert!(state.qr_challenge.is_none());
        assert!(state.welcome_sent);

        // A second `opened` within the same connection never double-fires.
        let actions = state.apply(TransportEvent::Opened);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_closed_logged_out_is_terminal() {
        let mut state = SessionState::new();
        state.begin_connect();
        state.apply(TransportEvent::Opened);

        let actions = state.apply(TransportEvent::Closed(CloseReason::LoggedOut));
        assert!(actions.is_empty(), "no reconnect after logout");
        assert_eq!(state.connection_state, ConnectionState::Disconnected);
        assert!(state.qr_challenge.is_none());
        assert!(!state.welcome_sent);
    }

    #[test]
    fn test_closed_transient_wipes_and_reconnects() {
        let mut state = SessionState::new();
        state.begin_connect();
        state.apply(TransportEvent::Opened);

        let actions = state.apply(TransportEvent::Closed(CloseReason::TransientFailure(
            "connection failure".to_string(),
        )));
        assert!(matches!(
            actions.as_slice(),
            [Action::WipeCredentialsAndReconnect]
        ));
        assert_eq!(state.connection_state, ConnectionState::Closed);
    }

    #[test]
    fn test_closed_other_schedules_reconnect() {
        let mut state = SessionState::new();
        state.begin_connect();

        let actions = state.apply(TransportEvent::Closed(CloseReason::Other(
            "stream ended".to_string(),
        )));
        assert!(matches!(actions.as_slice(), [Action::ScheduleReconnect]));
        assert_eq!(state.connection_state, ConnectionState::Closed);
    }

    #[test]
    fn test_next_state_is_disconnected_iff_logged_out() {
        // For all close reasons: disconnected iff logged out.
        let reasons = vec![
            (CloseReason::LoggedOut, ConnectionState::Disconnected),
            (
                CloseReason::TransientFailure("x".to_string()),
                ConnectionState::Closed,
            ),
            (CloseReason::Other("y".to_string()), ConnectionState::Closed),
        ];
        for (reason, expected) in reasons {
            let mut state = SessionState::new();
            state.begin_connect();
            state.apply(TransportEvent::Opened);
            state.apply(TransportEvent::Closed(reason));
            assert_eq!(state.connection_state, expected);
        }
    }

    #[test]
    fn test_welcome_fires_again_after_closure() {
        let mut state = SessionState::new();
        state.begin_connect();

        let first = state.apply(TransportEvent::Opened);
        assert!(matches!(first.as_slice(), [Action::SendGreeting]));

        state.apply(TransportEvent::Closed(CloseReason::Other("blip".to_string())));
        assert!(!state.welcome_sent, "flag resets on closure");

        state.begin_connect();
        let second = state.apply(TransportEvent::Opened);
        assert!(matches!(second.as_slice(), [Action::SendGreeting]));
    }

    #[test]
    fn test_credentials_update_passes_through() {
        let mut state = SessionState::new();
        let records = vec![CredentialRecord::new("creds", serde_json::json!({"k": 1}))];
        let actions = state.apply(TransportEvent::CredentialsUpdated(records));
        assert!(matches!(
            actions.as_slice(),
            [Action::PersistCredentials(r)] if r.len() == 1
        ));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = SessionState::new();
        state.begin_connect();
        state.apply(TransportEvent::PairingCodeIssued("QR-1".to_string()));
        state.apply(TransportEvent::Opened);

        state.reset();
        assert_eq!(state.connection_state, ConnectionState::Disconnected);
        assert!(state.qr_challenge.is_none());
        assert!(!state.welcome_sent);
    }

    #[test]
    fn test_snapshot_reports_challenge_presence() {
        let mut state = SessionState::new();
        state.begin_connect();
        state.apply(TransportEvent::PairingCodeIssued("QR-1".to_string()));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.connection_state, ConnectionState::Connecting);
        assert!(snapshot.has_qr_challenge);
    }
}
