use thiserror::Error;

use crate::api::{ApiError, ChatBackend, ChatHistory};
use crate::models::{ChatId, Conversation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("Failed to load chats: {0}")]
    List(ApiError),

    #[error("Failed to load chat history: {0}")]
    History(ApiError),

    #[error("Failed to create chat: {0}")]
    Create(ApiError),

    #[error("Failed to delete chat: {0}")]
    Delete(ApiError),
}

pub async fn load_chats(backend: &dyn ChatBackend) -> Result<Vec<Conversation>, ConversationError> {
    let chats = backend.fetch_chats().await.map_err(|e| {
        tracing::error!("Failed to load chats: {}", e);
        ConversationError::List(e)
    })?;
    tracing::debug!("Loaded {} chats", chats.len());
    Ok(chats)
}

pub async fn load_history(
    backend: &dyn ChatBackend,
    chat_id: ChatId,
) -> Result<ChatHistory, ConversationError> {
    backend.fetch_chat(chat_id).await.map_err(|e| {
        tracing::error!("Failed to load history for chat {}: {}", chat_id, e);
        ConversationError::History(e)
    })
}

pub async fn create_chat(backend: &dyn ChatBackend) -> Result<Conversation, ConversationError> {
    let chat = backend.create_chat().await.map_err(ConversationError::Create)?;
    tracing::info!("Created chat {}", chat.id);
    Ok(chat)
}

pub async fn delete_chat(backend: &dyn ChatBackend, chat_id: ChatId) -> Result<(), ConversationError> {
    backend
        .delete_chat(chat_id)
        .await
        .map_err(ConversationError::Delete)?;
    tracing::info!("Deleted chat {}", chat_id);
    Ok(())
}
