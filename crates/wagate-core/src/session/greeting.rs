//! Connection greeting.
//!
//! When a session reaches `open` for the first time, the gateway sends a
//! short status message to the account's own address. Dispatch is
//! fire-and-forget: a failed greeting is logged and never retried.

use chrono::{DateTime, Utc};

/// Build the greeting body for a freshly connected instance.
pub fn greeting_body(instance_id: &str, connected_at: DateTime<Utc>) -> String {
    format!(
        "WhatsApp gateway connected!\n\n\
         Status: connected\n\
         Instance: {instance_id}\n\
         Connected at: {}\n\n\
         Available endpoints:\n\
         - GET /api/whatsapp/status\n\
         - POST /api/whatsapp/send-message\n\
         - POST /api/whatsapp/disconnect\n\n\
         Automated greeting from the wagate gateway.",
        connected_at.to_rfc3339()
    )
}
