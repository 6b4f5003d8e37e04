pub mod integration;
pub mod llm;
pub mod messages;
pub mod speech;

use integration::SessionError;
use llm::CompletionError;
use speech::TranscriptionError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VoiceBotError {
    #[error("Completion error: {0}")]
    CompletionError(#[from] CompletionError),

    #[error("Transcription error: {0}")]
    TranscriptionError(#[from] TranscriptionError),

    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for VoiceBotError {
    fn from(e: std::io::Error) -> Self {
        VoiceBotError::IOError(e.to_string())
    }
}

impl VoiceBotError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Remote failures are transient; the next submission may succeed
            VoiceBotError::CompletionError(_) => true,
            VoiceBotError::TranscriptionError(_) => true,
            VoiceBotError::SessionError(SessionError::WorkerGone) => false,
            VoiceBotError::SessionError(_) => true,
            VoiceBotError::IOError(_) => false,
            VoiceBotError::ConfigError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            VoiceBotError::CompletionError(e) => e.to_string(),
            VoiceBotError::TranscriptionError(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            VoiceBotError::SessionError(SessionError::Busy) => {
                "Please wait for the current reply.".to_string()
            }
            VoiceBotError::SessionError(SessionError::WorkerGone) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            VoiceBotError::SessionError(_) => "Could not process your message.".to_string(),
            VoiceBotError::IOError(_) => "File system error occurred.".to_string(),
            VoiceBotError::ConfigError(_) => {
                "Configuration error. Please check your API key and settings.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, VoiceBotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: VoiceBotError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "secrets.toml").into();
        assert!(matches!(err, VoiceBotError::IOError(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_completion_error_is_recoverable() {
        let err: VoiceBotError = CompletionError::Timeout.into();
        assert!(err.is_recoverable());
        assert_eq!(err.user_message(), "Request timed out. Please try again.");
    }

    #[test]
    fn test_busy_user_message() {
        let err: VoiceBotError = SessionError::Busy.into();
        assert!(err.is_recoverable());
        assert_eq!(err.user_message(), "Please wait for the current reply.");
    }
}
