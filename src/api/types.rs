use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ChatId, Message, Role};

/// Prefix the backend puts in front of error text it writes into a reply body.
pub const ERROR_PREFIX: &str = "data: ERROR:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    /// Error text the backend reported itself, already stripped of its prefix.
    #[error("{0}")]
    Server(String),

    #[error("API error: {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Classify a non-success response from its status and body text.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match strip_error_prefix(body) {
            Some(message) => ApiError::Server(message.to_string()),
            None => ApiError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            },
        }
    }
}

/// Returns the message after `data: ERROR:` if `text` starts with it.
pub fn strip_error_prefix(text: &str) -> Option<&str> {
    text.trim_start().strip_prefix(ERROR_PREFIX).map(str::trim)
}

pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

#[derive(Debug, Serialize)]
pub struct ReplyRequest<'a> {
    #[serde(rename = "chatId")]
    pub chat_id: ChatId,
    pub q: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatHistory {
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    #[serde(default)]
    pub value: String,
}

impl ChatHistory {
    /// Converts wire entries into messages, dropping roles the client cannot show.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
            .into_iter()
            .filter_map(|entry| match Role::from_wire(&entry.role) {
                Some(role) => Some(Message {
                    role,
                    content: entry.value,
                }),
                None => {
                    tracing::debug!("Skipping history entry with role {:?}", entry.role);
                    None
                }
            })
            .collect()
    }
}

/// Body of a failed upload. Older deployments use `message`, newer ones `error`.
#[derive(Debug, Default, Deserialize)]
pub struct UploadFailureBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl UploadFailureBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}
