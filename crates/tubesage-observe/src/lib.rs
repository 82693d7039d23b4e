//! Observability setup for Tubesage.

pub mod tracing_setup;
