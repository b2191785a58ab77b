pub mod client;
pub mod models;

use async_trait::async_trait;

use crate::api::models::{ChatWindow, Conversation, CreatedChat};
use crate::error::ApiError;

/// The backend operations the chat list needs.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn fetch_window(&self, window: ChatWindow) -> Result<Vec<Conversation>, ApiError>;

    async fn create_chat(&self, content: &str) -> Result<CreatedChat, ApiError>;
}
