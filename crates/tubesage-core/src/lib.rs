//! Concurrent state-and-dispatch engine for Tubesage.
//!
//! This crate defines the "ports" (provider and transcript-source traits)
//! that the infrastructure layer implements, plus the shared mutable
//! stores and the request orchestration built on top of them. It depends
//! only on `tubesage-types` -- never on `tubesage-infra` or any HTTP/IO
//! crate.

pub mod cache;
pub mod dispatch;
pub mod llm;
pub mod session;
pub mod transcript;
