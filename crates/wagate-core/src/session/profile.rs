//! Connection profiles and reconnect timing.
//!
//! Two profiles exist side by side: **standard** (shorter timeouts, does
//! not mark the account online) and **resilient** (longer timeouts, longer
//! reconnect delay, marks online, higher send-retry budget). A session is
//! created under exactly one profile at connect time.

use std::time::Duration;

/// Reconnect delay after a transient failure whose credential wipe
/// succeeded.
pub const TRANSIENT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Fallback reconnect delay when the credential wipe itself failed.
pub const WIPE_FAILED_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Pause between the teardown and reconnect halves of `restart`.
pub const RESTART_PAUSE: Duration = Duration::from_secs(2);

/// Timing and behavior knobs for one transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    /// Profile name, for logs.
    pub name: &'static str,
    pub connect_timeout: Duration,
    pub keep_alive_interval: Duration,
    /// Delay between retries of individual wire requests.
    pub retry_request_delay: Duration,
    /// Retry budget for message delivery at the transport level.
    pub max_send_retries: u32,
    /// Deadline for queries against the network; `None` disables it.
    pub query_timeout: Option<Duration>,
    /// Whether the account is marked online when the connection opens.
    pub mark_online_on_connect: bool,
    /// Delay before re-entering `connect` after a non-transient closure.
    pub reconnect_delay: Duration,
}

impl ConnectionProfile {
    /// Default profile for interactive use.
    pub fn standard() -> Self {
        Self {
            name: "standard",
            connect_timeout: Duration::from_secs(30),
            keep_alive_interval: Duration::from_secs(10),
            retry_request_delay: Duration::from_millis(250),
            max_send_retries: 3,
            query_timeout: Some(Duration::from_secs(60)),
            mark_online_on_connect: false,
            reconnect_delay: Duration::from_secs(5),
        }
    }

    /// Long-haul profile for unattended operation.
    pub fn resilient() -> Self {
        Self {
            name: "resilient",
            connect_timeout: Duration::from_secs(60),
            keep_alive_interval: Duration::from_secs(30),
            retry_request_delay: Duration::from_millis(500),
            max_send_retries: 5,
            query_timeout: None,
            mark_online_on_connect: true,
            reconnect_delay: Duration::from_secs(10),
        }
    }
}

impl Default for ConnectionProfile {
    fn default() -> Self {
        Self::standard()
    }
}
