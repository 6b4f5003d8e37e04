//! Chat-completion client for a hosted language model
//!
//! Turns the persona, the conversation so far and the newest user message
//! into one request and classifies every failure into [`CompletionError`].

use crate::llm::config::CompletionConfig;
use crate::llm::prompts::PersonaPrompt;
use crate::messages::Turn;
use crate::{VoiceBotError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// Message used when the service's error body cannot be read
pub const UNKNOWN_API_ERROR: &str = "Unknown error";

/// Classified failure of a completion request.
///
/// The `Display` form is what ends up in the transcript.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("Network error: {detail}")]
    NetworkError { detail: String },

    #[error("API Error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Sorry, I encountered an error: {detail}")]
    Unknown { detail: String },
}

impl CompletionError {
    fn unknown(detail: impl Into<String>) -> Self {
        CompletionError::Unknown {
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout
        } else if err.is_connect() || err.is_request() {
            CompletionError::NetworkError {
                detail: err.to_string(),
            }
        } else {
            CompletionError::unknown(err.to_string())
        }
    }
}

/// Anything that can produce the next assistant reply
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(
        &self,
        persona: &PersonaPrompt,
        history: &[Turn],
        new_user_text: &str,
    ) -> std::result::Result<String, CompletionError>;
}

/// One entry of the request's message list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Persona first, then every prior turn in order, then the new user text.
pub fn build_messages(
    persona: &PersonaPrompt,
    history: &[Turn],
    new_user_text: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new("system", persona.as_str()));
    messages.extend(
        history
            .iter()
            .map(|turn| ChatMessage::new(turn.speaker.as_role(), turn.text.clone())),
    );
    messages.push(ChatMessage::new("user", new_user_text));
    messages
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Pull `error.message` out of a failure body, if there is one
fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_API_ERROR.to_string())
}

/// HTTP client for the completion endpoint
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    api_key: String,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Create a client; the timeout in `config` applies to every request.
    pub fn new(api_key: impl Into<String>, config: CompletionConfig) -> Result<Self> {
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

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    async fn send(
        &self,
        messages: Vec<ChatMessage>,
    ) -> std::result::Result<String, CompletionError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::unknown(format!("Failed to parse completion response: {}", e))
            }
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::unknown("Completion response contained no choices"))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| CompletionError::unknown("Completion reply had no content"))?;

        Ok(content.trim().to_string())
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> CompletionError {
    // A body we cannot read is treated the same as one we cannot parse.
    let body = response.text().await.unwrap_or_default();
    CompletionError::ApiError {
        status: status.as_u16(),
        message: parse_error_message(&body),
    }
}

#[async_trait]
impl ChatCompleter for CompletionClient {
    async fn complete(
        &self,
        persona: &PersonaPrompt,
        history: &[Turn],
        new_user_text: &str,
    ) -> std::result::Result<String, CompletionError> {
        let new_user_text = new_user_text.trim();
        if new_user_text.is_empty() {
            return Err(CompletionError::unknown("User message is empty"));
        }

        let messages = build_messages(persona, history, new_user_text);
        debug!(
            "Sending completion request: model={}, messages={}",
            self.config.model,
            messages.len()
        );

        let start = Instant::now();
        let result = self.send(messages).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(reply) => debug!("Completion received in {}ms ({} chars)", elapsed_ms, reply.len()),
            Err(e) => warn!("Completion failed after {}ms: {}", elapsed_ms, e),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &MockServer) -> CompletionClient {
        let config = CompletionConfig::default().with_endpoint(server.url("/v1/chat/completions"));
        CompletionClient::new("test-key", config).unwrap()
    }

    #[test]
    fn test_build_messages_order() {
        let persona = PersonaPrompt::new("Be nice.").unwrap();
        let history = vec![Turn::user("Hi"), Turn::assistant("Hello!")];

        let messages = build_messages(&persona, &history, "How are you?");

        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[0].content, "Be nice.");
        assert_eq!(messages[3].content, "How are you?");
    }

    #[test]
    fn test_parse_error_message() {
        assert_eq!(
            parse_error_message(r#"{"error":{"message":"rate limited"}}"#),
            "rate limited"
        );
        assert_eq!(parse_error_message("<html>bad gateway</html>"), UNKNOWN_API_ERROR);
        assert_eq!(parse_error_message(r#"{"error":{}}"#), UNKNOWN_API_ERROR);
        assert_eq!(parse_error_message(""), UNKNOWN_API_ERROR);
    }

    #[test]
    fn test_error_rendering() {
        let err = CompletionError::ApiError {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "API Error (429): rate limited");
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = CompletionClient::new("  ", CompletionConfig::default());
        assert!(matches!(result, Err(VoiceBotError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_success_returns_trimmed_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .json_body_partial(r#"{"max_tokens":150,"temperature":0.7}"#);
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "  Hi there\n"}}]
                }));
            })
            .await;

        let client = client_for(&server);
        let reply = client
            .complete(&PersonaPrompt::default(), &[], "Hello")
            .await;

        mock.assert_async().await;
        assert_eq!(reply, Ok("Hi there".to_string()));
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429)
                    .json_body(json!({"error": {"message": "rate limited"}}));
            })
            .await;

        let client = client_for(&server);
        let reply = client
            .complete(&PersonaPrompt::default(), &[], "Hello")
            .await;

        assert_eq!(
            reply,
            Err(CompletionError::ApiError {
                status: 429,
                message: "rate limited".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_unparseable_error_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(502).body("upstream exploded");
            })
            .await;

        let client = client_for(&server);
        let reply = client
            .complete(&PersonaPrompt::default(), &[], "Hello")
            .await;

        assert_eq!(
            reply,
            Err(CompletionError::ApiError {
                status: 502,
                message: UNKNOWN_API_ERROR.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!({"choices": [{"message": {"content": "late"}}]}));
            })
            .await;

        let config = CompletionConfig::default()
            .with_endpoint(server.url("/v1/chat/completions"))
            .with_timeout(Duration::from_millis(200));
        let client = CompletionClient::new("test-key", config).unwrap();

        let start = Instant::now();
        let reply = client
            .complete(&PersonaPrompt::default(), &[], "Hello")
            .await;

        assert_eq!(reply, Err(CompletionError::Timeout));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_empty_choices_is_unknown() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let client = client_for(&server);
        let reply = client
            .complete(&PersonaPrompt::default(), &[], "Hello")
            .await;

        assert!(matches!(reply, Err(CompletionError::Unknown { .. })));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        // Bind then drop a listener to get a port nobody is serving.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = CompletionConfig::default()
            .with_endpoint(format!("http://127.0.0.1:{}/v1/chat/completions", port));
        let client = CompletionClient::new("test-key", config).unwrap();

        let reply = client
            .complete(&PersonaPrompt::default(), &[], "Hello")
            .await;

        assert!(matches!(reply, Err(CompletionError::NetworkError { .. })));
    }
}
