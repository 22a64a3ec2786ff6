//! Network address (JID) normalization.
//!
//! Addresses on the wire are `<local>@<suffix>`. Direct peers use the
//! standard network suffix; group participants may appear under an
//! alternate-identifier suffix (e.g. `@lid`) that must be rewritten to the
//! standard form before the address leaves the gateway.

/// Standard user-address suffix of the messaging network.
pub const NETWORK_SUFFIX: &str = "@s.whatsapp.net";

/// Normalize an outbound address: append the standard network suffix when
/// it is absent.
pub fn normalize_address(address: &str) -> String {
    if address.contains(NETWORK_SUFFIX) {
        address.to_string()
    } else {
        format!("{address}{NETWORK_SUFFIX}")
    }
}

/// Rewrite a group-participant address to its canonical form: keep the
/// local part, substitute the standard network suffix for whatever
/// alternate suffix the wire used.
pub fn canonical_participant(participant: &str) -> String {
    let local = participant.split('@').next().unwrap_or(participant);
    format!("{local}{NETWORK_SUFFIX}")
}
