//! Engine configuration for Tubesage.
//!
//! `EngineConfig` represents the recognized tuning surface: cache bounds,
//! session expiry, transcript truncation policy, and the provider chain.
//! All fields have sensible defaults so a minimal config file works.

use serde::{Deserialize, Serialize};

use crate::llm::FallbackConfig;

/// Top-level configuration for the Tubesage engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of transcripts held in the cache.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Cache entry time-to-live in hours.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    /// Idle minutes after which a session is reaped.
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,

    /// Seconds between reaper passes.
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,

    /// Maximum conversation turns kept per session.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Transcripts longer than this are truncated to the first N chars.
    #[serde(default = "default_max_transcript_chars")]
    pub max_transcript_chars: usize,

    /// Target size of each transcript chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters carried over across chunk boundaries.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Token cap for generated responses.
    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: u32,

    /// Provider chain configuration.
    #[serde(default)]
    pub fallback: FallbackConfig,
}

fn default_cache_max_entries() -> usize {
    50
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_session_idle_minutes() -> u64 {
    60
}

fn default_reap_interval_secs() -> u64 {
    300
}

fn default_history_cap() -> usize {
    20
}

fn default_max_transcript_chars() -> usize {
    15_000
}

fn default_chunk_size() -> usize {
    6_000
}

fn default_chunk_overlap() -> usize {
    500
}

fn default_max_response_tokens() -> u32 {
    2_048
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_hours: default_cache_ttl_hours(),
            session_idle_minutes: default_session_idle_minutes(),
            reap_interval_secs: default_reap_interval_secs(),
            history_cap: default_history_cap(),
            max_transcript_chars: default_max_transcript_chars(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_response_tokens: default_max_response_tokens(),
            fallback: FallbackConfig::default(),
        }
    }
}
