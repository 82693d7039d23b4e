//! Request dispatcher: the composition root of the engine.
//!
//! Given a user identity and an intent, the dispatcher resolves the
//! session (create-if-absent), consults the transcript cache (miss
//! triggers a collaborator fetch plus a cache insert), routes generation
//! through the fallback chain, and applies the result back to session
//! state -- unless the session was reset or reassigned while the request
//! was in flight, in which case the result is discarded.
//!
//! The stores are created once at process start and handed in by
//! reference; there is no implicit global lookup.

use std::sync::Arc;

use tracing::{info, instrument};

use tubesage_types::config::EngineConfig;
use tubesage_types::error::DispatchError;
use tubesage_types::llm::{ChatRequest, GenerationOutcome, Message};
use tubesage_types::session::{Language, QaTurn, SessionSnapshot, SessionStats, UserId};
use tubesage_types::transcript::{CacheStats, TranscriptDoc, VideoId};

use crate::cache::TranscriptCache;
use crate::llm::FallbackChain;
use crate::session::{SessionStore, VideoRef};
use crate::transcript::{ChunkPolicy, TranscriptSource, process};

/// What the user wants, as parsed by the command layer.
#[derive(Debug, Clone)]
pub enum Intent {
    /// A video link; load its transcript and summarize it.
    VideoUrl(String),
    /// A free-text question about the loaded video.
    Question(String),
    /// Summarize the loaded video again.
    Summarize,
    /// In-depth analysis: arguments, evidence, data, counterpoints.
    DeepDive,
    /// Extract actionable items from the loaded video.
    ActionPoints,
    /// Switch the response language.
    SetLanguage(Language),
    /// Forget the loaded video and conversation.
    Reset,
}

/// Result of a dispatched intent, handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct DispatchReply {
    pub text: String,
    /// Which provider generated the text, when generation ran.
    pub provider_used: Option<String>,
    pub session: SessionSnapshot,
}

/// Reply when a question arrives before any video was loaded.
const NO_VIDEO_MESSAGE: &str = "Please send a video link first, then ask your questions about it.";

/// Whole-transcript analysis flavors, each with its own prompt shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalysisKind {
    Summary,
    DeepDive,
    ActionPoints,
}

/// Composition root wiring the stores, the chain, and the transcript
/// source together behind a single entry point.
pub struct Dispatcher<S: TranscriptSource> {
    cache: Arc<TranscriptCache>,
    sessions: Arc<SessionStore>,
    chain: Arc<FallbackChain>,
    source: S,
    config: EngineConfig,
}

impl<S: TranscriptSource> Dispatcher<S> {
    pub fn new(
        cache: Arc<TranscriptCache>,
        sessions: Arc<SessionStore>,
        chain: Arc<FallbackChain>,
        source: S,
        config: EngineConfig,
    ) -> Self {
        Self {
            cache,
            sessions,
            chain,
            source,
            config,
        }
    }

    /// The single entry point consumed by the presentation layer.
    #[instrument(skip(self, intent))]
    pub async fn dispatch(
        &self,
        user_id: UserId,
        intent: Intent,
    ) -> Result<DispatchReply, DispatchError> {
        match intent {
            Intent::VideoUrl(url) => self.handle_video_url(user_id, &url).await,
            Intent::Question(question) => self.handle_question(user_id, question).await,
            Intent::Summarize => self.handle_analysis(user_id, AnalysisKind::Summary).await,
            Intent::DeepDive => self.handle_analysis(user_id, AnalysisKind::DeepDive).await,
            Intent::ActionPoints => self.handle_analysis(user_id, AnalysisKind::ActionPoints).await,
            Intent::SetLanguage(language) => Ok(self.handle_set_language(user_id, language)),
            Intent::Reset => Ok(self.handle_reset(user_id)),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.sessions.stats()
    }

    async fn handle_video_url(
        &self,
        user_id: UserId,
        url: &str,
    ) -> Result<DispatchReply, DispatchError> {
        let video_id = VideoId::from_url(url).ok_or(DispatchError::InvalidUrl)?;

        let doc = self.load_transcript(&video_id).await?;
        let video = VideoRef {
            video_id: video_id.clone(),
            title: format!("Video {video_id}"),
            transcript: Arc::clone(&doc),
        };

        let language = self.sessions.with_session(user_id, |session| {
            session.set_video(video);
            session.language
        });

        info!(%user_id, %video_id, "video loaded, generating summary");
        let request = self.analysis_request(&doc, language, AnalysisKind::Summary);
        let (text, provider) = self.generate(request).await?;

        Ok(self.reply(user_id, text, Some(provider)))
    }

    async fn handle_question(
        &self,
        user_id: UserId,
        question: String,
    ) -> Result<DispatchReply, DispatchError> {
        // Snapshot everything the payload needs in one atomic pass, plus
        // the generation counter used to detect a mid-flight reset.
        let observed = self.sessions.with_session(user_id, |session| {
            session.video.as_ref().map(|video| {
                (
                    Arc::clone(&video.transcript),
                    session.language,
                    session.recent_history(5),
                    session.generation(),
                )
            })
        });

        let Some((doc, language, history, generation)) = observed else {
            return Ok(self.reply(user_id, NO_VIDEO_MESSAGE.to_string(), None));
        };

        let request = self.question_request(&doc, &history, &question, language);
        let (text, provider) = self.generate(request).await?;

        // Apply the result only if the session still refers to the state
        // we answered about; a reset or new video discards it.
        let applied = self
            .sessions
            .try_record_turn(user_id, generation, question, text.clone());
        if !applied {
            info!(%user_id, "session changed mid-flight, answer not recorded");
        }

        Ok(self.reply(user_id, text, Some(provider)))
    }

    async fn handle_analysis(
        &self,
        user_id: UserId,
        kind: AnalysisKind,
    ) -> Result<DispatchReply, DispatchError> {
        let observed = self.sessions.with_session(user_id, |session| {
            session
                .video
                .as_ref()
                .map(|video| (Arc::clone(&video.transcript), session.language))
        });

        let Some((doc, language)) = observed else {
            return Ok(self.reply(user_id, NO_VIDEO_MESSAGE.to_string(), None));
        };

        let request = self.analysis_request(&doc, language, kind);
        let (text, provider) = self.generate(request).await?;
        Ok(self.reply(user_id, text, Some(provider)))
    }

    fn handle_set_language(&self, user_id: UserId, language: Language) -> DispatchReply {
        self.sessions
            .with_session(user_id, |session| session.set_language(language));
        let text = format!("Okay, I'll respond in {} from now on.", language.display_name());
        self.reply(user_id, text, None)
    }

    fn handle_reset(&self, user_id: UserId) -> DispatchReply {
        self.sessions.with_session(user_id, |session| session.clear());
        self.reply(
            user_id,
            "Session cleared. Send a new video link to start over.".to_string(),
            None,
        )
    }

    /// Cache-or-fetch a transcript. Fetch failures are terminal and
    /// propagate unchanged; the engine never retries them.
    async fn load_transcript(
        &self,
        video_id: &VideoId,
    ) -> Result<Arc<TranscriptDoc>, DispatchError> {
        if let Some(doc) = self.cache.get(video_id) {
            return Ok(doc);
        }

        let fetched = self.source.fetch(video_id).await?;
        let policy = ChunkPolicy {
            max_chars: self.config.max_transcript_chars,
            chunk_size: self.config.chunk_size,
            overlap: self.config.chunk_overlap,
        };
        let doc = process(video_id, fetched, policy)?;
        self.cache.put(video_id.clone(), doc.clone());
        Ok(Arc::new(doc))
    }

    /// Run the chain; total exhaustion is the only failure that crosses
    /// this boundary.
    async fn generate(&self, request: ChatRequest) -> Result<(String, String), DispatchError> {
        match self.chain.generate(&request).await {
            GenerationOutcome::Success { text, provider, .. } => Ok((text, provider)),
            GenerationOutcome::Exhausted { failures } => {
                Err(DispatchError::ProvidersExhausted(failures))
            }
        }
    }

    fn reply(&self, user_id: UserId, text: String, provider_used: Option<String>) -> DispatchReply {
        let session = self
            .sessions
            .with_session(user_id, |session| session.snapshot());
        DispatchReply {
            text,
            provider_used,
            session,
        }
    }

    fn analysis_request(
        &self,
        doc: &TranscriptDoc,
        language: Language,
        kind: AnalysisKind,
    ) -> ChatRequest {
        let (system, task) = match kind {
            AnalysisKind::Summary => (
                "You are an expert video analyst. Be concise and factual.",
                "Summarize this video transcript: key points, the core takeaway, \
                 and who would benefit from watching.",
            ),
            AnalysisKind::DeepDive => (
                "You are an expert analyst. Analyze strictly based on the provided content.",
                "Perform a deep analysis of this video transcript: main arguments and \
                 evidence, methodologies or frameworks mentioned, data and statistics, \
                 notable quotes, and any counterpoints addressed.",
            ),
            AnalysisKind::ActionPoints => (
                "You are a productivity expert extracting action items from video content.",
                "Extract clear, actionable items from this video transcript, grouped into \
                 immediate, short-term, and long-term actions, plus any resources or \
                 people mentioned. Only include actions explicitly mentioned or strongly \
                 implied in the transcript.",
            ),
        };

        ChatRequest {
            model: String::new(),
            messages: vec![
                Message::system(system),
                Message::user(format!(
                    "{task}\n\nTRANSCRIPT:\n{}\n\n{}",
                    doc.text,
                    language.instruction()
                )),
            ],
            max_tokens: self.config.max_response_tokens,
            temperature: Some(0.3),
        }
    }

    fn question_request(
        &self,
        doc: &TranscriptDoc,
        history: &[QaTurn],
        question: &str,
        language: Language,
    ) -> ChatRequest {
        let history_text = if history.is_empty() {
            "No previous conversation.".to_string()
        } else {
            history
                .iter()
                .flat_map(|turn| {
                    [format!("Q: {}", turn.question), format!("A: {}", turn.answer)]
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        ChatRequest {
            model: String::new(),
            messages: vec![
                Message::system(
                    "You answer questions about a video using only its transcript. \
                     If the answer is not in the transcript, say so.",
                ),
                Message::user(format!(
                    "VIDEO TRANSCRIPT:\n{}\n\nCONVERSATION HISTORY:\n{}\n\nUSER QUESTION: {}\n\n{}",
                    doc.text,
                    history_text,
                    question,
                    language.instruction()
                )),
            ],
            max_tokens: self.config.max_response_tokens,
            temperature: Some(0.3),
        }
    }
}
