//! Session-facing types: user identity, response language, conversation
//! turns, and the read-only snapshot handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a chat user. Opaque to the engine beyond equality/hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response language for generated answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Kannada,
    Tamil,
    Telugu,
    Marathi,
}

impl Language {
    /// Display name used in language instructions and confirmations.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Kannada => "Kannada",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Marathi => "Marathi",
        }
    }

    /// Recognize a language request from a free-text keyword.
    ///
    /// Matches both the romanized name and the native script, so a user
    /// can write either "hindi" or "हिंदी".
    pub fn from_keyword(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        let table: [(&[&str], Language); 6] = [
            (&["hindi", "हिंदी", "हिन्दी"], Language::Hindi),
            (&["kannada", "ಕನ್ನಡ"], Language::Kannada),
            (&["tamil", "தமிழ்"], Language::Tamil),
            (&["telugu", "తెలుగు"], Language::Telugu),
            (&["marathi", "मराठी"], Language::Marathi),
            (&["english", "eng"], Language::English),
        ];
        for (keywords, language) in table {
            if keywords.iter().any(|k| text.contains(k)) {
                return Some(language);
            }
        }
        None
    }

    /// Instruction line appended to generation payloads.
    pub fn instruction(&self) -> String {
        match self {
            Language::English => "Respond in English.".to_string(),
            other => format!(
                "Respond entirely in {name}. All labels, headings, and content must be in {name}.",
                name = other.display_name()
            ),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name().to_lowercase())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "english" => Ok(Language::English),
            "hindi" => Ok(Language::Hindi),
            "kannada" => Ok(Language::Kannada),
            "tamil" => Ok(Language::Tamil),
            "telugu" => Ok(Language::Telugu),
            "marathi" => Ok(Language::Marathi),
            other => Err(format!("unsupported language: '{other}'")),
        }
    }
}

/// One question/answer exchange kept in the bounded session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaTurn {
    pub question: String,
    pub answer: String,
}

/// Read-only view of a session returned to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user_id: UserId,
    /// Currently loaded video, if any.
    pub video_id: Option<String>,
    pub video_title: Option<String>,
    pub language: Language,
    pub history_len: usize,
    pub created_at: DateTime<Utc>,
}

/// Session store counters for status reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionStats {
    pub active_count: usize,
}
