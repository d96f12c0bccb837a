use thiserror::Error;

use crate::api::{ApiError, ChatBackend};
use crate::models::{Attachment, ChatId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("That file type is not supported!")]
    UnsupportedType(String),

    #[error("No file selected for upload.")]
    NoFile,

    #[error("File upload failed: {0}")]
    Rejected(String),

    #[error("Network error during upload: {0}")]
    Network(String),
}

impl From<ApiError> for UploadError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Network(message) => UploadError::Network(message),
            ApiError::Server(message) => UploadError::Rejected(message),
            other => UploadError::Rejected(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub filename: String,
    pub size_mb: f64,
}

impl UploadReceipt {
    pub fn summary(&self) -> String {
        format!("{} - {:.2} MB", self.filename, self.size_mb)
    }
}

pub fn validate_attachment(attachment: &Attachment) -> Result<(), UploadError> {
    if attachment.is_accepted_type() {
        Ok(())
    } else {
        Err(UploadError::UnsupportedType(attachment.mime_type.clone()))
    }
}

pub async fn upload_attachment(
    backend: &dyn ChatBackend,
    chat_id: ChatId,
    attachment: Option<&Attachment>,
) -> Result<UploadReceipt, UploadError> {
    let attachment = attachment.ok_or(UploadError::NoFile)?;
    validate_attachment(attachment)?;

    tracing::info!(
        "Uploading {} ({} bytes) to chat {}",
        attachment.filename,
        attachment.data.len(),
        chat_id
    );
    backend.upload(chat_id, attachment).await.map_err(|e| {
        tracing::warn!("Upload of {} failed: {}", attachment.filename, e);
        UploadError::from(e)
    })?;

    Ok(UploadReceipt {
        filename: attachment.filename.clone(),
        size_mb: attachment.size_mb(),
    })
}
