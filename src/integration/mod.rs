//! Orchestration layer
//!
//! - **config**: credential loading and per-endpoint settings
//! - **session**: the conversation state machine and its presenter seam
//! - **worker**: a threaded session driven over channels

pub mod config;
pub mod session;
pub mod worker;

pub use config::{BotConfig, API_KEY_VAR, DEFAULT_SECRETS_PATH};
pub use session::{NullPresenter, Presenter, Session, SessionError, SessionState};
pub use worker::{ChannelPresenter, SessionCommand, SessionEvent, SessionHandle, SessionWorker};
