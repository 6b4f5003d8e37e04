//! Speech-to-text through a hosted transcription endpoint

use crate::llm::config::DEFAULT_REQUEST_TIMEOUT;
use crate::{Result, VoiceBotError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default speech-to-text endpoint
pub const DEFAULT_TRANSCRIPTION_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Model identifier sent with every upload
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Shown in place of text when the service recognized nothing
pub const COULD_NOT_TRANSCRIBE: &str = "Could not transcribe audio";

/// Configuration for the transcription client
#[derive(Clone, Debug)]
pub struct TranscriptionConfig {
    /// URL the audio is uploaded to
    pub endpoint: String,

    /// Model field of the multipart form
    pub model: String,

    /// File name reported for the uploaded clip
    pub file_name: String,

    /// MIME type reported for the uploaded clip
    pub mime_type: String,

    /// Bounded wait for the whole request
    pub timeout: Duration,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TRANSCRIPTION_ENDPOINT.to_string(),
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            file_name: "recording.wav".to_string(),
            mime_type: "audio/wav".to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl TranscriptionConfig {
    /// Set the endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Transcription endpoint is required".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("Transcription model is required".to_string());
        }
        if self.timeout.is_zero() {
            return Err("Transcription timeout must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Result of a successful transcription call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transcript {
    /// Recognized speech, trimmed
    Text(String),
    /// The service answered but recognized nothing
    Unrecognized,
}

impl Transcript {
    pub fn text(&self) -> Option<&str> {
        match self {
            Transcript::Text(text) => Some(text),
            Transcript::Unrecognized => None,
        }
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transcript::Text(text) => write!(f, "{}", text),
            Transcript::Unrecognized => write!(f, "{}", COULD_NOT_TRANSCRIBE),
        }
    }
}

/// Classified failure of a transcription request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    #[error("No audio was recorded")]
    EmptyAudio,

    #[error("Transcription timed out. Please try again.")]
    Timeout,

    #[error("Network error: {detail}")]
    NetworkError { detail: String },

    #[error("Transcription API Error ({status})")]
    ApiError { status: u16 },

    #[error("Transcription failed: {detail}")]
    Unknown { detail: String },
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TranscriptionError::Timeout
        } else if err.is_connect() || err.is_request() {
            TranscriptionError::NetworkError {
                detail: err.to_string(),
            }
        } else {
            TranscriptionError::Unknown {
                detail: err.to_string(),
            }
        }
    }
}

/// Anything that can turn a recorded clip into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> std::result::Result<Transcript, TranscriptionError>;
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: Option<String>,
}

/// HTTP client for the speech-to-text endpoint
#[derive(Clone)]
pub struct TranscriptionClient {
    client: Client,
    api_key: String,
    config: TranscriptionConfig,
}

impl TranscriptionClient {
    pub fn new(api_key: impl Into<String>, config: TranscriptionConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(VoiceBotError::ConfigError(
                "API key must not be empty".to_string(),
            ));
        }
        config.validate().map_err(VoiceBotError::ConfigError)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VoiceBotError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    pub fn config(&self) -> &TranscriptionConfig {
        &self.config
    }
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, audio: Vec<u8>) -> std::result::Result<Transcript, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio);
        }

        debug!("Uploading {} bytes for transcription", audio.len());

        let part = Part::bytes(audio)
            .file_name(self.config.file_name.clone())
            .mime_str(&self.config.mime_type)
            .map_err(|e| TranscriptionError::Unknown {
                detail: format!("Invalid MIME type: {}", e),
            })?;

        let form = Form::new()
            .text("model", self.config.model.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Transcription endpoint returned {}", status);
            return Err(TranscriptionError::ApiError {
                status: status.as_u16(),
            });
        }

        // A body without a usable text field degrades to the sentinel.
        let text = response
            .json::<TranscriptionResponse>()
            .await
            .ok()
            .and_then(|r| r.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        match text {
            Some(text) => {
                info!("Transcribed {} chars", text.len());
                Ok(Transcript::Text(text))
            }
            None => {
                info!("Transcription returned no text");
                Ok(Transcript::Unrecognized)
            }
        }
    }
}
