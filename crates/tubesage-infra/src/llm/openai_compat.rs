//! OpenAI-compatible LLM provider implementation.
//!
//! A single [`OpenAiCompatProvider`] serves any backend that speaks the
//! OpenAI chat completions protocol -- the local gateway primary and the
//! Groq direct fallback both come from this one codebase via
//! configurable base URLs.
//!
//! Uses [`async_openai`] for type-safe request/response handling. A
//! transport-successful response is still inspected for application-level
//! rate-limit markers in the body; gateways that swallow upstream 429s
//! and report them as ordinary text would otherwise look like successes.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use tubesage_core::llm::ChatProvider;
use tubesage_types::llm::{ChatRequest, ChatResponse, LlmError, MessageRole, ProviderConfig};

/// Substrings that mark a rate-limited response smuggled inside a
/// transport-successful body.
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "too many requests", "429"];

/// Unified provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug, so the API key held inside the
/// `async_openai::Client` can never leak through debug formatting.
pub struct OpenAiCompatProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
}

impl OpenAiCompatProvider {
    /// Create a provider from a chain configuration entry. The key lives
    /// only inside the client from here on.
    pub fn new(config: &ProviderConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.name.clone(),
            model: config.model.clone(),
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`ChatRequest`].
    fn build_request(&self, request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<ChatCompletionRequestMessage> = request
            .messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System | MessageRole::Assistant => {
                    // Assistant turns are replayed as system context; the
                    // engine folds conversation history into the user
                    // payload instead of resending assistant messages.
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    })
                }
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                        name: None,
                    })
                }
            })
            .collect();

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        }
    }
}

impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let oai_request = self.build_request(request);

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        // Transport success is not enough; inspect the payload.
        if body_is_rate_limited(&content) {
            tracing::warn!(
                provider = %self.provider_name,
                "rate-limit marker found in response body"
            );
            return Err(LlmError::RateLimited {
                retry_after_ms: None,
            });
        }

        Ok(ChatResponse {
            content: content.trim().to_string(),
            model: response.model,
        })
    }
}

/// Whether a transport-successful body carries an application-level
/// rate-limit signal.
fn body_is_rate_limited(content: &str) -> bool {
    let lowered = content.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "server_error" || error_type == "overloaded_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else {
                LlmError::Transport(err.to_string())
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if let Some(status) = reqwest_err.status() {
                match status.as_u16() {
                    401 | 403 => LlmError::AuthenticationFailed,
                    429 => LlmError::RateLimited {
                        retry_after_ms: None,
                    },
                    status => LlmError::Http {
                        status,
                        message: err.to_string(),
                    },
                }
            } else {
                LlmError::Transport(err.to_string())
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Transport(err.to_string()),
    }
}
