//! Transcript acquisition port and the engine's truncation/chunking policy.
//!
//! Fetching caption text from the hosting platform belongs to a
//! collaborator behind [`TranscriptSource`]; the engine only decides what
//! to keep. Long transcripts are cut to the first N characters, then
//! split into overlapping chunks that prefer to end on a sentence
//! boundary.

use tubesage_types::transcript::{FetchedTranscript, TranscriptDoc, TranscriptError, VideoId};

/// Port for transcript acquisition.
///
/// Failures are terminal as far as the engine is concerned: it never
/// retries a fetch (any retry policy belongs to the implementation).
pub trait TranscriptSource: Send + Sync {
    fn fetch(
        &self,
        video_id: &VideoId,
    ) -> impl std::future::Future<Output = Result<FetchedTranscript, TranscriptError>> + Send;
}

/// Truncation and chunking knobs, taken from the engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    pub max_chars: usize,
    pub chunk_size: usize,
    pub overlap: usize,
}

/// Apply the truncation/chunking policy to a fetched transcript.
///
/// Returns an `Empty` error when the fetched text is blank -- a transcript
/// with no content is never cache-worthy.
pub fn process(
    video_id: &VideoId,
    fetched: FetchedTranscript,
    policy: ChunkPolicy,
) -> Result<TranscriptDoc, TranscriptError> {
    let full_text = fetched.text.trim();
    if full_text.is_empty() {
        return Err(TranscriptError::Empty);
    }

    let truncated = full_text.len() > policy.max_chars;
    let text = if truncated {
        tracing::info!(
            video_id = %video_id,
            total = full_text.len(),
            kept = policy.max_chars,
            "long transcript truncated"
        );
        truncate_at_char_boundary(full_text, policy.max_chars)
    } else {
        full_text
    };

    let chunks = chunk_text(text, policy.chunk_size, policy.overlap);

    Ok(TranscriptDoc {
        video_id: video_id.clone(),
        text: text.to_string(),
        language: fetched.language,
        truncated,
        char_count: text.len(),
        chunks,
    })
}

fn truncate_at_char_boundary(text: &str, max: usize) -> &str {
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Split `text` into chunks of roughly `chunk_size` characters with
/// `overlap` characters carried across boundaries. A chunk ending past
/// its halfway mark on a ". " sentence break is cut there instead.
fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }

        let window = &text[start..end];
        if let Some(last_period) = window.rfind(". ") {
            if last_period > chunk_size / 2 {
                end = start + last_period + 1;
            }
        }

        chunks.push(text[start..end].trim().to_string());

        if end >= text.len() {
            break;
        }
        // Overlap must not stall the walk when a sentence cut lands close
        // to the previous start.
        let mut next = end.saturating_sub(overlap);
        if next <= start {
            next = end;
        }
        while next > 0 && !text.is_char_boundary(next) {
            next -= 1;
        }
        start = next;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ChunkPolicy {
        ChunkPolicy {
            max_chars: 100,
            chunk_size: 40,
            overlap: 10,
        }
    }

    fn vid() -> VideoId {
        VideoId::new("dQw4w9WgXcQ").unwrap()
    }

    fn fetched(text: &str) -> FetchedTranscript {
        FetchedTranscript {
            text: text.to_string(),
            language: "en".to_string(),
        }
    }

    #[test]
    fn test_short_text_single_chunk() {
        let doc = process(&vid(), fetched("a short transcript"), policy()).unwrap();
        assert!(!doc.truncated);
        assert_eq!(doc.chunks.len(), 1);
        assert_eq!(doc.chunks[0], "a short transcript");
        assert_eq!(doc.char_count, 18);
    }

    #[test]
    fn test_empty_text_rejected() {
        let err = process(&vid(), fetched("   "), policy()).unwrap_err();
        assert_eq!(err, TranscriptError::Empty);
    }

    #[test]
    fn test_long_text_truncated_to_max() {
        let text = "x".repeat(500);
        let doc = process(&vid(), fetched(&text), policy()).unwrap();
        assert!(doc.truncated);
        assert_eq!(doc.char_count, 100);
    }

    #[test]
    fn test_chunks_overlap() {
        let text = "abcdefghij".repeat(12); // 120 chars, no sentence breaks
        let chunks = chunk_text(&text, 40, 10);
        assert!(chunks.len() > 1);
        // The tail of each chunk reappears at the head of the next
        for pair in chunks.windows(2) {
            let tail = &pair[0][pair[0].len() - 10..];
            assert!(pair[1].starts_with(tail));
        }
    }

    #[test]
    fn test_chunk_prefers_sentence_boundary() {
        let text = format!("{}. {}", "a".repeat(30), "b".repeat(60));
        let chunks = chunk_text(&text, 40, 5);
        assert!(chunks[0].ends_with('.'), "first chunk should cut at the sentence break");
    }

    #[test]
    fn test_chunking_covers_all_text() {
        let text = "word ".repeat(100);
        let chunks = chunk_text(text.trim(), 60, 15);
        let last = chunks.last().unwrap();
        assert!(text.trim().ends_with(last.as_str()));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // Multi-byte content around the cut point must not panic
        let text = "ಕನ್ನಡ ".repeat(50);
        let doc = process(&vid(), fetched(&text), policy()).unwrap();
        assert!(doc.truncated);
        assert!(doc.char_count <= 100);
    }
}
