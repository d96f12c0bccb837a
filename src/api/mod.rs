pub mod client;
#[cfg(test)]
pub mod fake;
pub mod stream;
pub mod traits;
pub mod types;

pub use client::HttpBackend;
pub use stream::{ingest_reply, IngestOutcome, ReplyIngestor, ReplyUpdate};
pub use traits::ChatBackend;
pub use types::{ApiError, ChatHistory, ReplyStream};
