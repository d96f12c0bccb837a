use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use url::Url;

use super::traits::ChatBackend;
use super::types::{ApiError, ChatHistory, ReplyRequest, ReplyStream, UploadFailureBody};
use crate::config::ClientConfig;
use crate::models::{Attachment, ChatId, Conversation};

pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base: config.api_base.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", path, e)))
    }

    async fn expect_success(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let path = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("{} returned {}: {}", path, status, body.trim());
        Err(ApiError::from_status(status, &body))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

fn network_error(e: reqwest::Error) -> ApiError {
    ApiError::Network(e.to_string())
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn fetch_chats(&self) -> Result<Vec<Conversation>, ApiError> {
        let url = self.endpoint("api/fetch_chats")?;
        let response = self.client.get(url).send().await.map_err(network_error)?;
        let response = Self::expect_success(response).await?;
        Self::read_json(response).await
    }

    async fn fetch_chat(&self, chat_id: ChatId) -> Result<ChatHistory, ApiError> {
        let url = self.endpoint("api/fetch_chat")?;
        let response = self
            .client
            .get(url)
            .query(&[("chat_id", chat_id)])
            .send()
            .await
            .map_err(network_error)?;
        let response = Self::expect_success(response).await?;
        Self::read_json(response).await
    }

    async fn create_chat(&self) -> Result<Conversation, ApiError> {
        let url = self.endpoint("api/create_chat")?;
        let response = self.client.post(url).send().await.map_err(network_error)?;
        let response = Self::expect_success(response).await?;
        Self::read_json(response).await
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/delete_chat/{}", chat_id))?;
        let response = self.client.delete(url).send().await.map_err(network_error)?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn request_reply(&self, chat_id: ChatId, prompt: &str) -> Result<ReplyStream, ApiError> {
        let url = self.endpoint("api/request_gpt")?;
        let response = self
            .client
            .post(url)
            .json(&ReplyRequest { chat_id, q: prompt })
            .send()
            .await
            .map_err(network_error)?;
        let response = Self::expect_success(response).await?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(network_error));
        Ok(Box::pin(body))
    }

    async fn upload(&self, chat_id: ChatId, attachment: &Attachment) -> Result<(), ApiError> {
        let url = self.endpoint("api/upload")?;
        let part = Part::bytes(attachment.data.clone())
            .file_name(attachment.filename.clone())
            .mime_str(&attachment.mime_type)
            .map_err(|e| ApiError::InvalidRequest(format!("MIME type: {}", e)))?;
        let form = Form::new()
            .text("chatId", chat_id.to_string())
            .part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // Upload failures carry a JSON body rather than the reply error prefix.
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Upload of {} returned {}: {}", attachment.filename, status, body.trim());
        let message = serde_json::from_str::<UploadFailureBody>(&body)
            .ok()
            .and_then(UploadFailureBody::into_message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Upload failed").to_string());
        Err(ApiError::Server(message))
    }
}
