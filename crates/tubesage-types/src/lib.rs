//! Shared domain types for Tubesage.
//!
//! This crate carries the data shapes exchanged between the engine core
//! and its adapters: LLM requests/responses, provider configuration,
//! session snapshots, transcript documents, and the error taxonomy.
//! It depends only on serde/chrono/thiserror -- never on any IO crate.

pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod transcript;
