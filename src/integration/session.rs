//! One interactive conversation and its state machine
//!
//! `Idle --submit--> AwaitingReply --resolved--> Idle`. Every failure of the
//! completion call is turned into an assistant turn, so a session never gets
//! stuck and never ends because of a remote error.

use crate::llm::completion::{ChatCompleter, CompletionError};
use crate::llm::prompts::PersonaPrompt;
use crate::messages::{Conversation, Speaker, Turn};
use crate::speech::stt::{Transcriber, Transcript, TranscriptionError, COULD_NOT_TRANSCRIBE};
use crate::speech::tts::Utterance;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Receiver of everything the presentation layer needs to display or say
pub trait Presenter: Send {
    /// A turn was appended to the conversation
    fn on_turn_appended(&self, turn: &Turn);

    /// Something went wrong that the user should see
    fn on_error(&self, message: &str);

    /// An assistant reply is ready to be vocalized
    fn speak(&self, _utterance: &Utterance) {}
}

/// Presenter that ignores every signal
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn on_turn_appended(&self, _turn: &Turn) {}

    fn on_error(&self, _message: &str) {}
}

/// Orchestration state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for input
    #[default]
    Idle,
    /// A user turn was appended and its reply has not arrived yet
    AwaitingReply,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_awaiting_reply(&self) -> bool {
        matches!(self, SessionState::AwaitingReply)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::AwaitingReply => write!(f, "AwaitingReply"),
        }
    }
}

/// Rejections raised by the orchestration layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Still waiting for the previous reply")]
    Busy,

    #[error("Message is empty")]
    EmptyInput,

    #[error("No reply is pending")]
    NotAwaitingReply,

    #[error("Voice input is not configured for this session")]
    VoiceInputDisabled,

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error("Session worker has stopped")]
    WorkerGone,
}

/// A single conversation with its collaborators
pub struct Session {
    persona: PersonaPrompt,
    conversation: Conversation,
    state: SessionState,
    completer: Box<dyn ChatCompleter>,
    transcriber: Option<Box<dyn Transcriber>>,
    presenter: Box<dyn Presenter>,
}

impl Session {
    pub fn new(
        persona: PersonaPrompt,
        completer: Box<dyn ChatCompleter>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        Self {
            persona,
            conversation: Conversation::new(),
            state: SessionState::Idle,
            completer,
            transcriber: None,
            presenter,
        }
    }

    /// Enable voice input
    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn persona(&self) -> &PersonaPrompt {
        &self.persona
    }

    pub fn has_voice_input(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Append the user's turn and start waiting for a reply.
    ///
    /// Returns the appended turn. Rejected with [`SessionError::Busy`] while a
    /// reply is pending.
    pub fn submit(&mut self, text: &str) -> Result<Turn, SessionError> {
        if self.state.is_awaiting_reply() {
            return Err(SessionError::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let turn = self.conversation.push_text(Speaker::User, text).clone();
        self.state = SessionState::AwaitingReply;
        debug!("Session -> {} ({} turns)", self.state, self.conversation.len());

        self.presenter.on_turn_appended(&turn);
        Ok(turn)
    }

    /// Record the outcome of the pending completion and return to `Idle`.
    ///
    /// Errors become an assistant turn carrying their human-readable text.
    pub fn resolved(
        &mut self,
        outcome: Result<String, CompletionError>,
    ) -> Result<Turn, SessionError> {
        if !self.state.is_awaiting_reply() {
            return Err(SessionError::NotAwaitingReply);
        }

        let text = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                let message = e.to_string();
                warn!("Completion failed: {}", message);
                self.presenter.on_error(&message);
                message
            }
        };

        let turn = self.conversation.push_text(Speaker::Assistant, text).clone();
        self.state = SessionState::Idle;
        debug!("Session -> {} ({} turns)", self.state, self.conversation.len());

        self.presenter.on_turn_appended(&turn);
        if let Some(utterance) = Utterance::from_reply(&turn.text) {
            self.presenter.speak(&utterance);
        }
        Ok(turn)
    }

    /// Submit text, wait for the completion service and record its reply.
    ///
    /// Returns the assistant turn.
    pub async fn exchange(&mut self, text: &str) -> Result<Turn, SessionError> {
        self.submit(text)?;

        let outcome = {
            let turns = self.conversation.turns();
            let (history, newest) = turns.split_at(turns.len() - 1);
            self.completer
                .complete(&self.persona, history, &newest[0].text)
                .await
        };

        self.resolved(outcome)
    }

    /// Transcribe a recorded clip and exchange the recognized text.
    ///
    /// An unrecognized clip appends nothing and yields `Ok(None)`.
    pub async fn submit_audio(&mut self, audio: Vec<u8>) -> Result<Option<Turn>, SessionError> {
        if self.state.is_awaiting_reply() {
            return Err(SessionError::Busy);
        }
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or(SessionError::VoiceInputDisabled)?;

        match transcriber.transcribe(audio).await {
            Ok(Transcript::Text(text)) => {
                debug!("Transcribed voice input: {}", text);
                self.exchange(&text).await.map(Some)
            }
            Ok(Transcript::Unrecognized) => {
                info!("Voice input could not be transcribed");
                self.presenter.on_error(COULD_NOT_TRANSCRIBE);
                Ok(None)
            }
            Err(e) => {
                warn!("Transcription failed: {}", e);
                self.presenter.on_error(&e.to_string());
                Err(e.into())
            }
        }
    }

    /// Clear the conversation. Only valid while `Idle`.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.state.is_awaiting_reply() {
            return Err(SessionError::Busy);
        }
        let dropped = self.conversation.len();
        self.conversation.clear();
        info!("Conversation reset ({} turns dropped)", dropped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoCompleter;

    #[async_trait]
    impl ChatCompleter for EchoCompleter {
        async fn complete(
            &self,
            _persona: &PersonaPrompt,
            history: &[Turn],
            new_user_text: &str,
        ) -> Result<String, CompletionError> {
            Ok(format!("{} after {}", new_user_text, history.len()))
        }
    }

    fn session() -> Session {
        Session::new(
            PersonaPrompt::default(),
            Box::new(EchoCompleter),
            Box::new(NullPresenter),
        )
    }

    #[test]
    fn test_submit_then_resolve() {
        let mut session = session();

        let user = session.submit("  hello  ").unwrap();
        assert_eq!(user.text, "hello");
        assert_eq!(session.state(), SessionState::AwaitingReply);

        let reply = session.resolved(Ok("hi".to_string())).unwrap();
        assert_eq!(reply.speaker, Speaker::Assistant);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.conversation().len(), 2);
    }

    #[test]
    fn test_submit_while_awaiting_is_rejected() {
        let mut session = session();
        session.submit("first").unwrap();

        assert_eq!(session.submit("second"), Err(SessionError::Busy));
        assert_eq!(session.reset(), Err(SessionError::Busy));
        assert_eq!(session.conversation().len(), 1);
    }

    #[test]
    fn test_resolve_without_pending_reply() {
        let mut session = session();
        assert_eq!(
            session.resolved(Ok("stray".to_string())),
            Err(SessionError::NotAwaitingReply)
        );
        assert!(session.conversation().is_empty());
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut session = session();
        assert_eq!(session.submit("   "), Err(SessionError::EmptyInput));
        assert!(session.state().is_idle());
    }

    #[test]
    fn test_error_becomes_assistant_turn() {
        let mut session = session();
        session.submit("hello").unwrap();

        let turn = session
            .resolved(Err(CompletionError::ApiError {
                status: 500,
                message: "boom".to_string(),
            }))
            .unwrap();

        assert_eq!(turn.text, "API Error (500): boom");
        assert!(session.state().is_idle());
    }

    #[tokio::test]
    async fn test_exchange_passes_prior_history() {
        let mut session = session();

        let first = session.exchange("one").await.unwrap();
        let second = session.exchange("two").await.unwrap();

        assert_eq!(first.text, "one after 0");
        assert_eq!(second.text, "two after 2");
        assert_eq!(session.conversation().len(), 4);
    }

    #[tokio::test]
    async fn test_audio_without_transcriber() {
        let mut session = session();
        assert_eq!(
            session.submit_audio(vec![1, 2, 3]).await,
            Err(SessionError::VoiceInputDisabled)
        );
    }
}
