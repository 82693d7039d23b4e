//! Session store: one mutable conversation state per user identity.
//!
//! Backed by a `DashMap` so that distinct users never contend and every
//! read-modify-write on a single session (touch + field update) happens
//! under that session's shard lock as one atomic unit. Creation goes
//! through the entry API, so two concurrent first contacts for the same
//! user resolve to a single session -- one creation wins, the other
//! observes the winner's instance.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use tubesage_types::session::{Language, QaTurn, SessionSnapshot, SessionStats, UserId};
use tubesage_types::transcript::{TranscriptDoc, VideoId};

/// The video a session is currently talking about.
#[derive(Debug, Clone)]
pub struct VideoRef {
    pub video_id: VideoId,
    pub title: String,
    pub transcript: Arc<TranscriptDoc>,
}

/// Live mutable state for one user's conversation.
#[derive(Debug)]
pub struct UserSession {
    user_id: UserId,
    pub video: Option<VideoRef>,
    pub language: Language,
    history: VecDeque<QaTurn>,
    history_cap: usize,
    created_at: DateTime<Utc>,
    last_active: Instant,
    /// Bumped whenever the session is reset or pointed at a new video.
    /// In-flight generation results carry the generation they observed
    /// and are discarded if it no longer matches.
    generation: u64,
}

impl UserSession {
    fn new(user_id: UserId, history_cap: usize) -> Self {
        Self {
            user_id,
            video: None,
            language: Language::default(),
            history: VecDeque::new(),
            history_cap,
            created_at: Utc::now(),
            last_active: Instant::now(),
            generation: 0,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Point the session at a new video. Clears the conversation history
    /// and invalidates any in-flight results for the previous video.
    pub fn set_video(&mut self, video: VideoRef) {
        self.video = Some(video);
        self.history.clear();
        self.generation += 1;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Append a question/answer turn, dropping the oldest beyond the cap.
    pub fn record_turn(&mut self, question: String, answer: String) {
        self.history.push_back(QaTurn { question, answer });
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }
    }

    /// The `n` most recent turns, oldest first.
    pub fn recent_history(&self, n: usize) -> Vec<QaTurn> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Reset to a fresh state in place. Invalidates in-flight results.
    pub fn clear(&mut self) {
        self.video = None;
        self.language = Language::default();
        self.history.clear();
        self.generation += 1;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id,
            video_id: self.video.as_ref().map(|v| v.video_id.to_string()),
            video_title: self.video.as_ref().map(|v| v.title.clone()),
            language: self.language,
            history_len: self.history.len(),
            created_at: self.created_at,
        }
    }
}

/// Map from user identity to session state, with idle-based expiry.
pub struct SessionStore {
    sessions: DashMap<UserId, UserSession>,
    history_cap: usize,
}

impl SessionStore {
    pub fn new(history_cap: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            history_cap,
        }
    }

    /// Run `f` against the user's session, creating it first if absent.
    /// The idle timestamp refresh and the mutation are one atomic unit.
    pub fn with_session<T>(&self, user_id: UserId, f: impl FnOnce(&mut UserSession) -> T) -> T {
        let mut entry = self
            .sessions
            .entry(user_id)
            .or_insert_with(|| {
                debug!(%user_id, "new session created");
                UserSession::new(user_id, self.history_cap)
            });
        entry.touch();
        f(&mut entry)
    }

    /// Read-only view of an existing session, if any.
    pub fn snapshot(&self, user_id: UserId) -> Option<SessionSnapshot> {
        self.sessions.get(&user_id).map(|s| s.snapshot())
    }

    /// Append a turn only if the session still has the generation the
    /// caller observed when the request started. Returns false when the
    /// result is stale (session reset or reassigned mid-flight) and was
    /// discarded.
    pub fn try_record_turn(
        &self,
        user_id: UserId,
        observed_generation: u64,
        question: String,
        answer: String,
    ) -> bool {
        match self.sessions.get_mut(&user_id) {
            Some(mut session) if session.generation() == observed_generation => {
                session.touch();
                session.record_turn(question, answer);
                true
            }
            _ => {
                debug!(%user_id, "stale generation result discarded");
                false
            }
        }
    }

    /// Drop the session entirely.
    pub fn remove(&self, user_id: UserId) -> bool {
        self.sessions.remove(&user_id).is_some()
    }

    /// Remove every session idle for longer than `idle_timeout`.
    ///
    /// The comparison is against the scan start time, so a session
    /// touched after the scan began is never removed by this pass.
    pub fn reap(&self, idle_timeout: Duration) -> usize {
        let scan_start = Instant::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| scan_start.duration_since(session.last_active) <= idle_timeout);
        let removed = before - self.sessions.len();
        if removed > 0 {
            debug!(removed, "expired sessions removed");
        }
        removed
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_count: self.sessions.len(),
        }
    }
}
