//! Shared domain types for wagate.
//!
//! This crate contains the core domain types used across the wagate gateway:
//! session state, canonical messages, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod error;
pub mod message;
pub mod session;
