//! In-memory `ChatBackend` for service tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::traits::ChatBackend;
use super::types::{ApiError, ChatHistory, ReplyStream};
use crate::models::{Attachment, ChatId, Conversation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchChats,
    FetchChat(ChatId),
    CreateChat,
    DeleteChat(ChatId),
    RequestReply(ChatId, String),
    Upload(ChatId, String),
}

#[derive(Default)]
struct FakeState {
    chats: Vec<Conversation>,
    histories: Vec<(ChatId, ChatHistory)>,
    next_id: ChatId,
    reply: Vec<Result<Bytes, ApiError>>,
    reply_error: Option<ApiError>,
    upload_error: Option<ApiError>,
    fail_all: Option<ApiError>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chats(chats: Vec<Conversation>) -> Self {
        let next_id = chats.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        Self {
            state: Mutex::new(FakeState {
                chats,
                next_id,
                ..Default::default()
            }),
        }
    }

    pub fn set_history(&self, chat_id: ChatId, history: ChatHistory) {
        let mut state = self.state.lock().unwrap();
        state.histories.retain(|(id, _)| *id != chat_id);
        state.histories.push((chat_id, history));
    }

    pub fn set_reply(&self, chunks: Vec<Result<Bytes, ApiError>>) {
        self.state.lock().unwrap().reply = chunks;
    }

    pub fn set_reply_text(&self, chunks: &[&str]) {
        self.set_reply(
            chunks
                .iter()
                .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
                .collect(),
        );
    }

    pub fn fail_reply(&self, error: ApiError) {
        self.state.lock().unwrap().reply_error = Some(error);
    }

    pub fn fail_upload(&self, error: ApiError) {
        self.state.lock().unwrap().upload_error = Some(error);
    }

    /// Every call fails with `error` from now on.
    pub fn fail_all(&self, error: ApiError) {
        self.state.lock().unwrap().fail_all = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: Call) -> Result<std::sync::MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.fail_all {
            Some(e) => Err(e.clone()),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn fetch_chats(&self) -> Result<Vec<Conversation>, ApiError> {
        let state = self.record(Call::FetchChats)?;
        Ok(state.chats.clone())
    }

    async fn fetch_chat(&self, chat_id: ChatId) -> Result<ChatHistory, ApiError> {
        let state = self.record(Call::FetchChat(chat_id))?;
        Ok(state
            .histories
            .iter()
            .find(|(id, _)| *id == chat_id)
            .map(|(_, h)| h.clone())
            .unwrap_or_default())
    }

    async fn create_chat(&self) -> Result<Conversation, ApiError> {
        let mut state = self.record(Call::CreateChat)?;
        let id = state.next_id.max(1);
        state.next_id = id + 1;
        let chat = Conversation {
            id,
            title: "New Chat".to_string(),
        };
        state.chats.push(chat.clone());
        Ok(chat)
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ApiError> {
        let mut state = self.record(Call::DeleteChat(chat_id))?;
        let before = state.chats.len();
        state.chats.retain(|c| c.id != chat_id);
        if state.chats.len() == before {
            return Err(ApiError::Status {
                status: 404,
                reason: "Not Found".to_string(),
            });
        }
        Ok(())
    }

    async fn request_reply(&self, chat_id: ChatId, prompt: &str) -> Result<ReplyStream, ApiError> {
        let mut state = self.record(Call::RequestReply(chat_id, prompt.to_string()))?;
        if let Some(e) = state.reply_error.clone() {
            return Err(e);
        }
        let chunks = std::mem::take(&mut state.reply);
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn upload(&self, chat_id: ChatId, attachment: &Attachment) -> Result<(), ApiError> {
        let state = self.record(Call::Upload(chat_id, attachment.filename.clone()))?;
        match &state.upload_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
