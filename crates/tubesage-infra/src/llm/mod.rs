//! LLM provider adapters.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use tubesage_core::llm::{BoxChatProvider, FallbackChain};
use tubesage_types::llm::FallbackConfig;

/// Build the provider fallback chain from configuration.
///
/// Every configured entry becomes an [`OpenAiCompatProvider`]; ordering
/// by priority is handled by the chain itself.
pub fn build_chain(config: &FallbackConfig) -> FallbackChain {
    let entries = config
        .providers
        .iter()
        .map(|pc| (pc.clone(), BoxChatProvider::new(OpenAiCompatProvider::new(pc))))
        .collect();
    FallbackChain::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubesage_types::llm::ProviderConfig;

    #[test]
    fn test_build_chain_orders_by_priority() {
        let config = FallbackConfig {
            providers: vec![
                ProviderConfig {
                    name: "groq".to_string(),
                    base_url: "https://api.groq.com/openai/v1".to_string(),
                    api_key: "k2".to_string(),
                    model: "llama-3.3-70b-versatile".to_string(),
                    priority: 1,
                    max_retries: 1,
                    backoff_ms: vec![3_000],
                },
                ProviderConfig {
                    name: "gateway".to_string(),
                    base_url: "http://127.0.0.1:18789/v1".to_string(),
                    api_key: "k1".to_string(),
                    model: "openclaw".to_string(),
                    priority: 0,
                    max_retries: 3,
                    backoff_ms: vec![3_000, 6_000],
                },
            ],
        };

        let chain = build_chain(&config);
        assert_eq!(chain.provider_names(), vec!["gateway", "groq"]);
    }
}
