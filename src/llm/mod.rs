//! Hosted chat-completion integration
//!
//! - **config**: endpoint, model and the fixed sampling constants
//! - **prompts**: the persona prompt and the canned sample questions
//! - **completion**: the HTTP client and its error taxonomy

pub mod completion;
pub mod config;
pub mod prompts;

// Re-export commonly used types
pub use completion::{build_messages, ChatCompleter, ChatMessage, CompletionClient, CompletionError};
pub use config::CompletionConfig;
pub use prompts::{PersonaPrompt, PERSONA_PROMPT, SAMPLE_QUESTIONS};
