use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const APP_ID: &str = "com.parley.Parley";
pub const APP_NAME: &str = "Parley";

/// Shown as the only message of a conversation that has no history yet.
pub const GREETING: &str = "Hi, how may I help you?";

/// How long the error banner stays up before it clears itself.
pub const ERROR_BANNER_TIMEOUT: Duration = Duration::from_secs(10);

/// Attachment types the backend can index.
pub const ACCEPTED_UPLOAD_MIME_TYPES: [&str; 2] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const ENDPOINT_VAR: &str = "PARLEY_API_ENDPOINT";
const TIMEOUT_VAR: &str = "PARLEY_REQUEST_TIMEOUT_SECS";
const DEFAULT_ENDPOINT: &str = "localhost:7071";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API endpoint '{value}': {source}")]
    InvalidEndpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("API endpoint '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("Invalid PARLEY_REQUEST_TIMEOUT_SECS value '{0}'")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL that every `api/...` path is joined onto. Always ends in `/`.
    pub api_base: Url,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = std::env::var(ENDPOINT_VAR).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let timeout = std::env::var(TIMEOUT_VAR).ok();
        Self::from_values(&endpoint, timeout.as_deref())
    }

    pub fn from_values(endpoint: &str, timeout_secs: Option<&str>) -> Result<Self, ConfigError> {
        let api_base = parse_endpoint(endpoint)?;
        let connect_timeout = match timeout_secs.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::InvalidTimeout(raw.to_string()))?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        Ok(Self {
            api_base,
            connect_timeout,
        })
    }
}

/// Accepts either a full URL or a bare `host:port`, which is treated as http.
fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let mut url = Url::parse(&with_scheme).map_err(|source| ConfigError::InvalidEndpoint {
        value: raw.to_string(),
        source,
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::UnsupportedScheme(raw.to_string()));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
