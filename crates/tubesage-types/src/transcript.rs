//! Transcript types: validated video identifiers, the raw fetch result
//! handed over by the acquisition collaborator, and the processed
//! document the engine caches.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of a YouTube video id.
const VIDEO_ID_LEN: usize = 11;

/// Validated video identifier (11 characters of `[A-Za-z0-9_-]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare id string.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.len() == VIDEO_ID_LEN && id.bytes().all(is_id_byte) {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Extract a video id from any of the common YouTube URL shapes:
    /// `watch?v=`, `youtu.be/`, `/shorts/`, `/embed/`.
    pub fn from_url(url: &str) -> Option<Self> {
        let url = url.trim();
        for marker in ["v=", "youtu.be/", "/shorts/", "/embed/"] {
            if let Some(pos) = url.find(marker) {
                let rest = &url[pos + marker.len()..];
                let candidate: String = rest
                    .bytes()
                    .take_while(|b| is_id_byte(*b))
                    .map(char::from)
                    .collect();
                if let Some(id) = Self::new(candidate) {
                    return Some(id);
                }
            }
        }
        None
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a piece of text looks like a YouTube link at all.
pub fn is_youtube_url(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    text.contains("youtube.com/") || text.contains("youtu.be/")
}

/// Raw transcript as returned by the acquisition collaborator, before
/// the engine applies its truncation/chunking policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedTranscript {
    pub text: String,
    /// Caption language code reported by the source (e.g., "en", "hi→en").
    pub language: String,
}

/// Processed transcript document held in the cache and in sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptDoc {
    pub video_id: VideoId,
    /// Transcript text after truncation to the configured maximum.
    pub text: String,
    pub language: String,
    /// True when the source text exceeded the maximum and was cut.
    pub truncated: bool,
    /// Overlapping chunks of `text` for chunked prompting.
    pub chunks: Vec<String>,
    pub char_count: usize,
}

/// Transcript cache counters for status reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage, for status display.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

/// Terminal failures reported by the transcript acquisition collaborator.
///
/// The engine never retries these; they propagate to the caller as the
/// stable "no transcript available" condition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("video is unavailable or private")]
    Unavailable,

    #[error("captions are disabled for this video")]
    CaptionsDisabled,

    #[error("no captions available for this video")]
    NoCaptions,

    #[error("transcript requests are temporarily blocked")]
    Blocked,

    #[error("transcript is empty")]
    Empty,

    #[error("transcript fetch failed: {0}")]
    Fetch(String),
}
