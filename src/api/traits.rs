use async_trait::async_trait;

use super::types::{ApiError, ChatHistory, ReplyStream};
use crate::models::{Attachment, ChatId, Conversation};

/// The remote chat service. `HttpBackend` talks to the real API; tests swap in
/// an in-memory fake.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn fetch_chats(&self) -> Result<Vec<Conversation>, ApiError>;

    async fn fetch_chat(&self, chat_id: ChatId) -> Result<ChatHistory, ApiError>;

    async fn create_chat(&self) -> Result<Conversation, ApiError>;

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ApiError>;

    /// Opens the streamed reply for `prompt`. Fails before any byte is read
    /// when the request itself is refused.
    async fn request_reply(&self, chat_id: ChatId, prompt: &str) -> Result<ReplyStream, ApiError>;

    async fn upload(&self, chat_id: ChatId, attachment: &Attachment) -> Result<(), ApiError>;
}
