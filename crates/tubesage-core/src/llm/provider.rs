//! ChatProvider trait definition.
//!
//! This is the capability abstraction every language-model backend
//! implements: send a prompt, get normalized text or a normalized error.
//! The fallback chain depends only on this trait, never on a concrete
//! backend. Implementations live in tubesage-infra.

use tubesage_types::llm::{ChatRequest, ChatResponse, LlmError};

/// Trait for language-model backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Every
/// attempt is assumed idempotent for the upstream service, so the chain
/// may always retry a failed call without deduplication.
pub trait ChatProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gateway", "groq").
    fn name(&self) -> &str;

    /// Default model identifier for this provider.
    fn model(&self) -> &str;

    /// Send a chat request and receive the full response.
    ///
    /// A transport-successful call is not sufficient evidence of
    /// success: implementations must inspect the response body and
    /// report application-level throttling as [`LlmError::RateLimited`].
    fn chat(
        &self,
        request: &ChatRequest,
    ) -> impl std::future::Future<Output = Result<ChatResponse, LlmError>> + Send;
}
