use thiserror::Error;

/// Errors surfaced by caller-facing session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("instance not found")]
    NotFound,

    #[error("instance '{0}' already exists")]
    AlreadyExists(String),

    #[error("session is not connected")]
    NotConnected,

    #[error("send rejected by transport: {0}")]
    SendFailed(String),
}

/// Errors raised by the transport adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("transport rejected the request: {0}")]
    Rejected(String),

    #[error("media payload unavailable: {0}")]
    MediaUnavailable(String),
}

/// Errors from the credential store (used by trait definitions in wagate-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),
}

/// Errors from a single webhook delivery attempt.
///
/// Delivery is best-effort: these are logged by the relay and never
/// surfaced to the message producer.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery timed out")]
    Timeout,

    #[error("endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("request error: {0}")]
    Request(String),
}
