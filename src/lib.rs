//! Conversation list for a chat client: fetches the windowed lists from the
//! backend, merges and caches them, groups them by date, and keeps the cache
//! consistent when new conversations are created.

pub mod api;
pub mod app;
pub mod chats;
pub mod error;
pub mod events;
pub mod storage;
pub mod ui;
pub mod utils;

pub use api::models::{ChatWindow, Conversation, CreatedChat};
pub use api::ChatBackend;
pub use app::{AppState, ChatSession};
pub use chats::{bucketize, merge, CreationCoordinator, DateBuckets, FailurePolicy};
pub use error::{ApiError, CreationError, FetchError};
pub use events::SidebarEvent;
pub use storage::{CachePolicy, CacheStatus, ChatCache};
