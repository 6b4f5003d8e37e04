//! Session worker for front ends
//!
//! Runs a [`Session`] on its own thread with a dedicated tokio runtime and
//! talks to the front end over channels: commands in, events out.

use crate::integration::config::BotConfig;
use crate::integration::session::{Presenter, Session, SessionError};
use crate::llm::completion::{ChatCompleter, CompletionClient};
use crate::llm::prompts::PersonaPrompt;
use crate::messages::Turn;
use crate::speech::stt::{Transcriber, TranscriptionClient, TranscriptionError};
use crate::speech::tts::Utterance;
use crate::Result;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

/// Commands accepted by the session worker
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Exchange a typed message
    SubmitText(String),

    /// Transcribe a recorded clip and exchange the result
    SubmitAudio(Vec<u8>),

    /// Clear the conversation
    Reset,

    /// Stop the worker
    Shutdown,
}

/// Events emitted by the session worker
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A turn was appended to the conversation
    TurnAppended(Turn),

    /// An assistant reply should be vocalized
    Speak(Utterance),

    /// Something the user should see went wrong
    Error(String),

    /// The pending submission finished; new input is accepted
    Idle,

    /// The conversation was cleared
    ResetComplete,

    /// Worker has shut down
    Shutdown,
}

/// Presenter that forwards every signal as a [`SessionEvent`]
pub struct ChannelPresenter {
    event_tx: Sender<SessionEvent>,
}

impl ChannelPresenter {
    pub fn new(event_tx: Sender<SessionEvent>) -> Self {
        Self { event_tx }
    }
}

impl Presenter for ChannelPresenter {
    fn on_turn_appended(&self, turn: &Turn) {
        let _ = self.event_tx.send(SessionEvent::TurnAppended(turn.clone()));
    }

    fn on_error(&self, message: &str) {
        let _ = self.event_tx.send(SessionEvent::Error(message.to_string()));
    }

    fn speak(&self, utterance: &Utterance) {
        let _ = self.event_tx.send(SessionEvent::Speak(utterance.clone()));
    }
}

/// Handle for driving the worker from a front end
pub struct SessionHandle {
    command_tx: Sender<SessionCommand>,
    event_rx: Receiver<SessionEvent>,
    in_flight: Arc<AtomicBool>,
    voice_input: bool,
    worker: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Submit a typed message.
    ///
    /// Fails with [`SessionError::Busy`] while a previous submission is
    /// still being answered.
    pub fn submit_text(&self, text: &str) -> std::result::Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        self.begin()?;
        self.dispatch(SessionCommand::SubmitText(text.to_string()))
    }

    /// Submit a recorded clip for transcription
    pub fn submit_audio(&self, audio: Vec<u8>) -> std::result::Result<(), SessionError> {
        if !self.voice_input {
            return Err(SessionError::VoiceInputDisabled);
        }
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio.into());
        }
        self.begin()?;
        self.dispatch(SessionCommand::SubmitAudio(audio))
    }

    /// Clear the conversation; rejected while a reply is pending
    pub fn reset(&self) -> std::result::Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        self.command_tx
            .send(SessionCommand::Reset)
            .map_err(|_| SessionError::WorkerGone)
    }

    /// Whether a submission is being processed
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn has_voice_input(&self) -> bool {
        self.voice_input
    }

    /// Try to receive an event without blocking
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Get the event receiver
    pub fn event_receiver(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    /// Stop the worker and wait for its thread to exit
    pub fn shutdown(mut self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Session worker panicked");
            }
        }
    }

    fn begin(&self) -> std::result::Result<(), SessionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| SessionError::Busy)
    }

    fn dispatch(&self, cmd: SessionCommand) -> std::result::Result<(), SessionError> {
        self.command_tx.send(cmd).map_err(|_| {
            self.in_flight.store(false, Ordering::SeqCst);
            SessionError::WorkerGone
        })
    }
}

/// Spawns session workers
pub struct SessionWorker {
    persona: PersonaPrompt,
    completer: Box<dyn ChatCompleter>,
    transcriber: Option<Box<dyn Transcriber>>,
}

impl SessionWorker {
    pub fn new(persona: PersonaPrompt, completer: Box<dyn ChatCompleter>) -> Self {
        Self {
            persona,
            completer,
            transcriber: None,
        }
    }

    /// Worker backed by the hosted completion and transcription endpoints
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        config.validate()?;
        let completer = CompletionClient::new(config.api_key.clone(), config.completion.clone())?;
        let transcriber =
            TranscriptionClient::new(config.api_key.clone(), config.transcription.clone())?;

        Ok(Self::new(config.persona.clone(), Box::new(completer))
            .with_transcriber(Box::new(transcriber)))
    }

    /// Enable voice input
    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Start the worker thread
    pub fn spawn(self) -> Result<SessionHandle> {
        let (command_tx, command_rx) = bounded(100);
        // Unbounded: front ends may poll `is_busy()` without draining events.
        let (event_tx, event_rx) = unbounded();
        let in_flight = Arc::new(AtomicBool::new(false));
        let voice_input = self.transcriber.is_some();

        let worker_in_flight = Arc::clone(&in_flight);
        let worker = thread::Builder::new()
            .name("voicebot-session".to_string())
            .spawn(move || self.run(command_rx, event_tx, worker_in_flight))?;

        Ok(SessionHandle {
            command_tx,
            event_rx,
            in_flight,
            voice_input,
            worker: Some(worker),
        })
    }

    fn run(
        self,
        command_rx: Receiver<SessionCommand>,
        event_tx: Sender<SessionEvent>,
        in_flight: Arc<AtomicBool>,
    ) {
        info!("Session worker starting");

        let runtime = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to create tokio runtime: {}", e);
                let _ = event_tx.send(SessionEvent::Error(format!(
                    "Runtime creation failed: {}",
                    e
                )));
                let _ = event_tx.send(SessionEvent::Shutdown);
                return;
            }
        };

        let presenter = ChannelPresenter::new(event_tx.clone());
        let mut session = Session::new(self.persona, self.completer, Box::new(presenter));
        if let Some(transcriber) = self.transcriber {
            session = session.with_transcriber(transcriber);
        }

        info!("Session worker ready");

        loop {
            match command_rx.recv() {
                Ok(SessionCommand::SubmitText(text)) => {
                    debug!("Processing text submission");
                    if let Err(e) = runtime.block_on(session.exchange(&text)) {
                        warn!("Text submission rejected: {}", e);
                        let _ = event_tx.send(SessionEvent::Error(e.to_string()));
                    }
                    in_flight.store(false, Ordering::SeqCst);
                    let _ = event_tx.send(SessionEvent::Idle);
                }
                Ok(SessionCommand::SubmitAudio(audio)) => {
                    debug!("Processing audio submission ({} bytes)", audio.len());
                    // Transcription failures already reached the presenter.
                    if let Err(e) = runtime.block_on(session.submit_audio(audio)) {
                        debug!("Audio submission ended without a reply: {}", e);
                    }
                    in_flight.store(false, Ordering::SeqCst);
                    let _ = event_tx.send(SessionEvent::Idle);
                }
                Ok(SessionCommand::Reset) => match session.reset() {
                    Ok(()) => {
                        let _ = event_tx.send(SessionEvent::ResetComplete);
                    }
                    Err(e) => {
                        let _ = event_tx.send(SessionEvent::Error(e.to_string()));
                    }
                },
                Ok(SessionCommand::Shutdown) => {
                    info!("Session worker shutdown requested");
                    let _ = event_tx.send(SessionEvent::Shutdown);
                    break;
                }
                Err(_) => {
                    warn!("Command channel disconnected");
                    break;
                }
            }
        }

        info!("Session worker stopped");
    }
}
