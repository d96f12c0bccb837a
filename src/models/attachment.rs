use std::path::Path;

use crate::config::ACCEPTED_UPLOAD_MIME_TYPES;

/// A file picked for upload, held in memory until the next message is sent.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("data", &format!("[{} bytes]", self.data.len()))
            .finish()
    }
}

impl Attachment {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read the file at `path` without blocking the calling thread.
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();
        Ok(Self::new(filename, mime_for_path(path), data))
    }

    pub fn is_accepted_type(&self) -> bool {
        is_accepted_mime(&self.mime_type)
    }

    pub fn size_mb(&self) -> f64 {
        self.data.len() as f64 / (1024.0 * 1024.0)
    }
}

pub fn is_accepted_mime(mime_type: &str) -> bool {
    let lowered = mime_type.trim().to_ascii_lowercase();
    ACCEPTED_UPLOAD_MIME_TYPES.contains(&lowered.as_str())
}

/// Guess the MIME type from the extension. Unknown extensions map to
/// `application/octet-stream`, which the upload filter rejects.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("doc") => "application/msword",
        Some("txt") | Some("md") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
