//! Dispatch-level error taxonomy.
//!
//! Transient provider failures never reach this level -- the fallback
//! chain absorbs them. What remains is the small set of conditions the
//! presentation layer has to tell the user about, each with a single
//! stable message that never leaks provider-specific text.

use thiserror::Error;

use crate::llm::ProviderFailure;
use crate::transcript::TranscriptError;

/// Errors surfaced by the dispatcher to the presentation layer.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The text looked like a video link but no id could be extracted.
    #[error("invalid video URL")]
    InvalidUrl,

    /// The acquisition collaborator reported a terminal condition.
    /// Never retried by the engine.
    #[error("transcript unavailable: {0}")]
    Transcript(#[from] TranscriptError),

    /// Every configured provider failed every attempt.
    #[error("all providers exhausted ({} providers failed)", .0.len())]
    ProvidersExhausted(Vec<ProviderFailure>),
}

impl DispatchError {
    /// The stable, user-facing message for this error.
    ///
    /// Distinguishes "no transcript available" from "generation
    /// temporarily unavailable"; everything else stays internal.
    pub fn user_message(&self) -> &'static str {
        match self {
            DispatchError::InvalidUrl => {
                "That doesn't look like a valid video link. Please check the URL and try again."
            }
            DispatchError::Transcript(_) => {
                "No transcript is available for this video. Please try a different one."
            }
            DispatchError::ProvidersExhausted(_) => {
                "Generation is temporarily unavailable. Please try again in a moment."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_error_message() {
        let err = DispatchError::Transcript(TranscriptError::NoCaptions);
        assert!(err.user_message().contains("No transcript"));
    }

    #[test]
    fn test_exhausted_message_hides_provider_detail() {
        let err = DispatchError::ProvidersExhausted(vec![ProviderFailure {
            provider: "gateway".to_string(),
            error: "http status 500: boom".to_string(),
        }]);
        let msg = err.user_message();
        assert!(msg.contains("temporarily unavailable"));
        assert!(!msg.contains("gateway"));
        assert!(!msg.contains("500"));
    }

    #[test]
    fn test_display_counts_failures() {
        let err = DispatchError::ProvidersExhausted(vec![
            ProviderFailure {
                provider: "a".to_string(),
                error: "x".to_string(),
            },
            ProviderFailure {
                provider: "b".to_string(),
                error: "y".to_string(),
            },
        ]);
        assert!(err.to_string().contains("2 providers"));
    }
}
