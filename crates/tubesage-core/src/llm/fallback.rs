//! Multi-provider fallback chain with per-provider retry budgets.
//!
//! Providers are tried in priority order. Each provider gets up to its
//! configured number of attempts, with a strictly increasing backoff
//! between them; exhausting one provider silently moves to the next with
//! a fresh budget. The first success anywhere returns immediately and no
//! lower-priority provider is ever started. Only total exhaustion across
//! every provider surfaces as a failure, aggregating each provider's
//! terminal error.

use tracing::{debug, warn};

use tubesage_types::llm::{
    ChatRequest, GenerationOutcome, LlmError, ProviderConfig, ProviderFailure,
};

use super::box_provider::BoxChatProvider;

struct ChainedProvider {
    config: ProviderConfig,
    provider: BoxChatProvider,
}

/// Ordered sequence of providers evaluated with early termination on
/// success.
pub struct FallbackChain {
    providers: Vec<ChainedProvider>,
}

impl FallbackChain {
    /// Build a chain from configurations paired with provider instances.
    /// Pairs are sorted by configured priority (lower tried first).
    pub fn new(entries: Vec<(ProviderConfig, BoxChatProvider)>) -> Self {
        let mut providers: Vec<ChainedProvider> = entries
            .into_iter()
            .map(|(config, provider)| ChainedProvider { config, provider })
            .collect();
        providers.sort_by_key(|p| p.config.priority);
        Self { providers }
    }

    /// Names of the configured providers in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.config.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Send a request through the chain.
    ///
    /// The backoff waits use `tokio::time::sleep`, suspending only this
    /// request's task; no store lock is held across an attempt or a wait,
    /// so unrelated requests proceed concurrently.
    pub async fn generate(&self, request: &ChatRequest) -> GenerationOutcome {
        let mut failures: Vec<ProviderFailure> = Vec::new();
        let mut attempts: u32 = 0;

        for chained in &self.providers {
            let name = chained.config.name.as_str();
            let mut terminal: Option<LlmError> = None;

            for attempt in 0..chained.config.max_retries {
                attempts += 1;
                match chained.provider.chat(request).await {
                    Ok(response) => {
                        debug!(provider = name, attempts, "generation succeeded");
                        return GenerationOutcome::Success {
                            text: response.content,
                            provider: name.to_string(),
                            attempts,
                        };
                    }
                    Err(err) => {
                        let retryable = err.is_retryable();
                        warn!(
                            provider = name,
                            attempt = attempt + 1,
                            error = %err,
                            "attempt failed"
                        );
                        terminal = Some(err);

                        // Retrying an auth or request-shape error cannot
                        // succeed; spend the rest of this provider's
                        // budget and move on.
                        if !retryable {
                            break;
                        }
                        if attempt + 1 < chained.config.max_retries {
                            let wait = chained.config.backoff_for(attempt);
                            debug!(provider = name, wait_ms = wait.as_millis() as u64, "backing off");
                            tokio::time::sleep(wait).await;
                        }
                    }
                }
            }

            // Budget exhausted for this provider. The transition to the
            // next one is invisible to the caller.
            let error = terminal
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string());
            warn!(provider = name, %error, "provider exhausted, failing over");
            failures.push(ProviderFailure {
                provider: name.to_string(),
                error,
            });
        }

        GenerationOutcome::Exhausted { failures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use tubesage_types::llm::{ChatResponse, Message};

    use crate::llm::provider::ChatProvider;

    struct MockProvider {
        name: String,
        calls: Arc<AtomicU32>,
        /// Errors returned before succeeding; once drained, succeeds.
        script: std::sync::Mutex<Vec<LlmError>>,
        always_fail: bool,
    }

    impl MockProvider {
        fn ok(name: &str, calls: Arc<AtomicU32>) -> Self {
            Self {
                name: name.to_string(),
                calls,
                script: std::sync::Mutex::new(Vec::new()),
                always_fail: false,
            }
        }

        fn failing(name: &str, calls: Arc<AtomicU32>, error_factory: fn() -> LlmError) -> Self {
            Self {
                name: name.to_string(),
                calls,
                script: std::sync::Mutex::new(vec![
                    error_factory(),
                    error_factory(),
                    error_factory(),
                    error_factory(),
                    error_factory(),
                ]),
                always_fail: true,
            }
        }

        fn flaky(name: &str, calls: Arc<AtomicU32>, errors: Vec<LlmError>) -> Self {
            Self {
                name: name.to_string(),
                calls,
                script: std::sync::Mutex::new(errors),
                always_fail: false,
            }
        }
    }

    impl ChatProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if let Some(err) = script.pop() {
                return Err(err);
            }
            if self.always_fail {
                return Err(LlmError::Transport("still down".to_string()));
            }
            Ok(ChatResponse {
                content: format!("answer from {}", self.name),
                model: "mock-model".to_string(),
            })
        }
    }

    fn config(name: &str, priority: u32, max_retries: u32) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            base_url: "http://localhost/v1".to_string(),
            api_key: "test".to_string(),
            model: "mock-model".to_string(),
            priority,
            max_retries,
            backoff_ms: vec![10, 20],
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: String::new(),
            messages: vec![Message::user("what is this video about?")],
            max_tokens: 128,
            temperature: Some(0.3),
        }
    }

    fn transport_error() -> LlmError {
        LlmError::Transport("connection reset".to_string())
    }

    #[tokio::test]
    async fn test_primary_success_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let chain = FallbackChain::new(vec![(
            config("primary", 0, 3),
            BoxChatProvider::new(MockProvider::ok("primary", Arc::clone(&calls))),
        )]);

        match chain.generate(&request()).await {
            GenerationOutcome::Success {
                text,
                provider,
                attempts,
            } => {
                assert_eq!(provider, "primary");
                assert_eq!(attempts, 1);
                assert_eq!(text, "answer from primary");
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failover_after_primary_exhausts_retries() {
        let primary_calls = Arc::new(AtomicU32::new(0));
        let secondary_calls = Arc::new(AtomicU32::new(0));
        let chain = FallbackChain::new(vec![
            (
                config("primary", 0, 3),
                BoxChatProvider::new(MockProvider::failing(
                    "primary",
                    Arc::clone(&primary_calls),
                    transport_error,
                )),
            ),
            (
                config("secondary", 1, 3),
                BoxChatProvider::new(MockProvider::ok("secondary", Arc::clone(&secondary_calls))),
            ),
        ]);

        match chain.generate(&request()).await {
            GenerationOutcome::Success {
                provider, attempts, ..
            } => {
                assert_eq!(provider, "secondary");
                assert_eq!(attempts, 4, "3 primary attempts + 1 secondary");
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(primary_calls.load(Ordering::SeqCst), 3);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_within_provider_before_failover() {
        let calls = Arc::new(AtomicU32::new(0));
        let chain = FallbackChain::new(vec![(
            config("primary", 0, 3),
            BoxChatProvider::new(MockProvider::flaky(
                "primary",
                Arc::clone(&calls),
                vec![transport_error(), transport_error()],
            )),
        )]);

        match chain.generate(&request()).await {
            GenerationOutcome::Success {
                provider, attempts, ..
            } => {
                assert_eq!(provider, "primary");
                assert_eq!(attempts, 3, "two failures then success on the same provider");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_level_rate_limit_consumes_a_retry() {
        // A transport-successful response whose body carried a rate-limit
        // marker surfaces as RateLimited from the adapter and must count
        // as a failed attempt.
        let calls = Arc::new(AtomicU32::new(0));
        let chain = FallbackChain::new(vec![(
            config("primary", 0, 2),
            BoxChatProvider::new(MockProvider::flaky(
                "primary",
                Arc::clone(&calls),
                vec![LlmError::RateLimited { retry_after_ms: None }],
            )),
        )]);

        match chain.generate(&request()).await {
            GenerationOutcome::Success { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_exhaustion_aggregates_terminal_errors() {
        let chain = FallbackChain::new(vec![
            (
                config("primary", 0, 3),
                BoxChatProvider::new(MockProvider::failing(
                    "primary",
                    Arc::new(AtomicU32::new(0)),
                    transport_error,
                )),
            ),
            (
                config("secondary", 1, 2),
                BoxChatProvider::new(MockProvider::failing(
                    "secondary",
                    Arc::new(AtomicU32::new(0)),
                    || LlmError::Overloaded("busy".to_string()),
                )),
            ),
        ]);

        match chain.generate(&request()).await {
            GenerationOutcome::Exhausted { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].provider, "primary");
                assert!(failures[0].error.contains("connection reset"));
                assert_eq!(failures[1].provider, "secondary");
                assert!(failures[1].error.contains("busy"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_error_skips_remaining_budget() {
        let primary_calls = Arc::new(AtomicU32::new(0));
        let secondary_calls = Arc::new(AtomicU32::new(0));
        let chain = FallbackChain::new(vec![
            (
                config("primary", 0, 3),
                BoxChatProvider::new(MockProvider::failing(
                    "primary",
                    Arc::clone(&primary_calls),
                    || LlmError::AuthenticationFailed,
                )),
            ),
            (
                config("secondary", 1, 3),
                BoxChatProvider::new(MockProvider::ok("secondary", Arc::clone(&secondary_calls))),
            ),
        ]);

        match chain.generate(&request()).await {
            GenerationOutcome::Success { provider, .. } => assert_eq!(provider, "secondary"),
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(
            primary_calls.load(Ordering::SeqCst),
            1,
            "auth errors are not retried against the same provider"
        );
    }

    #[tokio::test]
    async fn test_priority_ordering() {
        let first_calls = Arc::new(AtomicU32::new(0));
        let second_calls = Arc::new(AtomicU32::new(0));
        // Deliberately passed out of order; priority decides.
        let chain = FallbackChain::new(vec![
            (
                config("direct", 1, 3),
                BoxChatProvider::new(MockProvider::ok("direct", Arc::clone(&second_calls))),
            ),
            (
                config("gateway", 0, 3),
                BoxChatProvider::new(MockProvider::ok("gateway", Arc::clone(&first_calls))),
            ),
        ]);

        assert_eq!(chain.provider_names(), vec!["gateway", "direct"]);
        match chain.generate(&request()).await {
            GenerationOutcome::Success { provider, .. } => assert_eq!(provider, "gateway"),
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(second_calls.load(Ordering::SeqCst), 0, "no work started below the winner");
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let chain = FallbackChain::new(Vec::new());
        assert!(chain.is_empty());
        match chain.generate(&request()).await {
            GenerationOutcome::Exhausted { failures } => assert!(failures.is_empty()),
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }
}
