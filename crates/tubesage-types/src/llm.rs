//! LLM request/response types for Tubesage.
//!
//! These types model the data shapes for provider interactions: chat
//! requests, responses, retry policy configuration, and the outcome of a
//! generation routed through the fallback chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request to an LLM provider for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier. Empty string means "use the provider's default".
    #[serde(default)]
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Response from an LLM provider for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("http status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl LlmError {
    /// Whether this error is worth retrying against the same provider.
    ///
    /// Transient conditions (transport failures, throttling, server
    /// errors) are retryable. Auth and request-shape errors are not --
    /// retrying them burns the budget without any chance of success.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Transport(_) | LlmError::RateLimited { .. } | LlmError::Overloaded(_) => true,
            LlmError::Http { status, .. } => *status == 429 || *status >= 500,
            LlmError::AuthenticationFailed
            | LlmError::InvalidRequest(_)
            | LlmError::Deserialization(_) => false,
        }
    }
}

/// Configuration for a single provider in the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Human-readable name (e.g., "gateway", "groq").
    pub name: String,
    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: String,
    /// API key. May be empty in the file and filled from the environment.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier to request.
    pub model: String,
    /// Priority for fallback ordering; lower = tried first.
    pub priority: u32,
    /// Attempts allowed against this provider before failing over.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff schedule in milliseconds, indexed by failed-attempt count.
    /// Beyond the end of the schedule the last entry keeps doubling, so
    /// the wait is strictly increasing.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> Vec<u64> {
    vec![3_000, 6_000]
}

impl ProviderConfig {
    /// Backoff to wait after the failed attempt with the given zero-based
    /// index, before the next attempt against the same provider.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let idx = attempt as usize;
        let ms = match self.backoff_ms.get(idx) {
            Some(ms) => *ms,
            None => {
                let last = self.backoff_ms.last().copied().unwrap_or(1_000);
                let extra = (idx + 1 - self.backoff_ms.len()) as u32;
                last.saturating_mul(2u64.saturating_pow(extra))
            }
        };
        Duration::from_millis(ms)
    }
}

/// Configuration for the multi-provider fallback chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Provider configurations; ordered by `priority` at chain build time.
    pub providers: Vec<ProviderConfig>,
}

/// Terminal failure recorded for one provider after its budget ran out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

/// Outcome of a generation routed through the fallback chain.
///
/// Failover between providers is never visible here; only the final
/// result is. `attempts` counts every attempt across all providers that
/// ran before the winning one succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Success {
        text: String,
        provider: String,
        attempts: u32,
    },
    Exhausted {
        failures: Vec<ProviderFailure>,
    },
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }
}
