//! Speech processing modules for STT and TTS
//!
//! This module provides:
//! - Speech-to-text (STT) through a hosted transcription endpoint
//! - Speakable reply descriptors for a host text-to-speech engine

pub mod stt;
pub mod tts;

// Re-export commonly used types
pub use stt::{
    Transcriber, Transcript, TranscriptionClient, TranscriptionConfig, TranscriptionError,
    COULD_NOT_TRANSCRIBE,
};
pub use tts::{normalize_text_for_speech, Utterance, VoiceProfile};
