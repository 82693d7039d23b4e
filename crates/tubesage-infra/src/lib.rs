//! Infrastructure implementations for Tubesage.
//!
//! Adapter implementations of the ports defined in `tubesage-core`:
//! OpenAI-compatible LLM providers and configuration loading.

pub mod config;
pub mod llm;
