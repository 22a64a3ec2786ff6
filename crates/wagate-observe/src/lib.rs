//! Observability setup for wagate.

pub mod tracing_setup;
