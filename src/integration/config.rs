//! Configuration for the integration layer
//!
//! Bundles the credential with the completion and transcription settings.

use crate::llm::config::CompletionConfig;
use crate::llm::prompts::PersonaPrompt;
use crate::speech::stt::TranscriptionConfig;
use crate::{Result, VoiceBotError};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Environment variable holding the API credential
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Secrets file consulted when the environment variable is unset
pub const DEFAULT_SECRETS_PATH: &str = "secrets.toml";

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,
}

/// Configuration for a complete bot session
#[derive(Clone)]
pub struct BotConfig {
    /// Bearer credential shared by both endpoints
    pub api_key: String,

    /// Persona sent as the system message
    pub persona: PersonaPrompt,

    /// Completion endpoint configuration
    pub completion: CompletionConfig,

    /// Transcription endpoint configuration
    pub transcription: TranscriptionConfig,
}

impl BotConfig {
    /// Create a configuration with default endpoints and the default persona
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            persona: PersonaPrompt::default(),
            completion: CompletionConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }

    /// Read the credential from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_VAR).map_err(|_| {
            VoiceBotError::ConfigError(format!("{} is not set", API_KEY_VAR))
        })?;
        let config = Self::new(key);
        config.validate()?;
        Ok(config)
    }

    /// Read the credential from a TOML secrets file (`OPENAI_API_KEY = "..."`)
    pub fn from_secrets_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let secrets: SecretsFile = toml::from_str(&raw).map_err(|e| {
            VoiceBotError::ConfigError(format!("Invalid secrets file {:?}: {}", path, e))
        })?;
        let key = secrets.openai_api_key.ok_or_else(|| {
            VoiceBotError::ConfigError(format!("{} missing from {:?}", API_KEY_VAR, path))
        })?;

        debug!("Loaded API key from {:?}", path);
        let config = Self::new(key);
        config.validate()?;
        Ok(config)
    }

    /// Environment first, then the secrets file
    pub fn load(secrets_path: impl AsRef<Path>) -> Result<Self> {
        match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => {
                let config = Self::new(key);
                config.validate()?;
                Ok(config)
            }
            _ => Self::from_secrets_file(secrets_path),
        }
    }

    /// Set the persona
    pub fn with_persona(mut self, persona: PersonaPrompt) -> Self {
        self.persona = persona;
        self
    }

    /// Set the completion configuration
    pub fn with_completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    /// Set the transcription configuration
    pub fn with_transcription(mut self, transcription: TranscriptionConfig) -> Self {
        self.transcription = transcription;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(VoiceBotError::ConfigError(format!(
                "{} must not be empty",
                API_KEY_VAR
            )));
        }
        self.completion.validate().map_err(VoiceBotError::ConfigError)?;
        self.transcription
            .validate()
            .map_err(VoiceBotError::ConfigError)?;
        Ok(())
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("api_key", &"<redacted>")
            .field("persona", &self.persona)
            .field("completion", &self.completion)
            .field("transcription", &self.transcription)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BotConfig::new("sk-test");
        assert!(config.validate().is_ok());
        assert_eq!(config.completion.max_tokens, 150);
        assert_eq!(config.transcription.model, "whisper-1");
    }

    #[test]
    fn test_blank_key_rejected() {
        let config = BotConfig::new("   ");
        assert!(matches!(config.validate(), Err(VoiceBotError::ConfigError(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = BotConfig::new("sk-very-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_secrets_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "OPENAI_API_KEY = \"sk-from-file\"").unwrap();

        let config = BotConfig::from_secrets_file(file.path()).unwrap();
        assert_eq!(config.api_key, "sk-from-file");
    }

    #[test]
    fn test_secrets_file_missing_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "OTHER = \"x\"").unwrap();

        let result = BotConfig::from_secrets_file(file.path());
        assert!(matches!(result, Err(VoiceBotError::ConfigError(_))));
    }

    #[test]
    fn test_missing_secrets_file_is_io_error() {
        let result = BotConfig::from_secrets_file("/nonexistent/voicebot/secrets.toml");
        assert!(matches!(result, Err(VoiceBotError::IOError(_))));
    }
}
