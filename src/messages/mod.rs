pub mod storage;
pub mod types;

pub use storage::Conversation;
pub use types::{Speaker, Turn};
