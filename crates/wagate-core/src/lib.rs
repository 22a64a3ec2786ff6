//! Session lifecycle management and message relay for wagate.
//!
//! This crate defines the "ports" (transport, credential store, webhook
//! sender traits) that the infrastructure layer implements, plus the logic
//! built on top of them: the per-session connection state machine with its
//! reconnect policy, the instance registry, the inbound-message normalizer,
//! and the best-effort webhook relay. It depends only on `wagate-types` --
//! never on `wagate-infra` or any database/HTTP crate.

pub mod credential;
pub mod gateway;
pub mod jid;
pub mod normalize;
pub mod registry;
pub mod relay;
pub mod session;
pub mod transport;
