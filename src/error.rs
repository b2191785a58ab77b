use thiserror::Error;

use crate::api::models::ChatWindow;

/// Failures talking to the chat backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A windowed list request failed, so the aggregation could not complete.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch {window} chats: {source}")]
    Source {
        window: ChatWindow,
        #[source]
        source: ApiError,
    },
}

/// The create-conversation request failed. Shown to the user, never retried.
#[derive(Debug, Error)]
#[error("Failed to create chat: {0}")]
pub struct CreationError(#[from] pub ApiError);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config dir")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
