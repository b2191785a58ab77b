//! Chat list aggregation: fetching the windowed lists, merging them,
//! bucketing by date and coordinating new conversations.

pub mod buckets;
pub mod coordinator;
pub mod fetcher;
pub mod merge;

pub use buckets::{bucketize, DateBuckets};
pub use coordinator::CreationCoordinator;
pub use fetcher::{fetch_all, try_fetch_all, FailurePolicy};
pub use merge::merge;

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::api::models::{parse_timestamp, ChatWindow, Conversation, CreatedChat};
    use crate::api::ChatBackend;
    use crate::error::ApiError;

    pub fn ts(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    /// A conversation titled after its id.
    pub fn conv(id: &str, created_at: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: id.to_string(),
            created_at: ts(created_at),
            message_count: None,
            last_message: None,
        }
    }

    #[derive(Default)]
    struct Script {
        // None answers 503
        windows: HashMap<ChatWindow, Option<Vec<Conversation>>>,
        created: Option<CreatedChat>,
        delay: Duration,
    }

    /// In-memory backend. Each call sees the script as it was when the call
    /// started, then waits out the configured delay.
    #[derive(Default)]
    pub struct FakeBackend {
        script: Mutex<Script>,
        fetch_calls: AtomicUsize,
        create_calls: AtomicUsize,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_window(&self, window: ChatWindow, chats: Vec<Conversation>) {
            self.script.lock().unwrap().windows.insert(window, Some(chats));
        }

        pub fn fail_window(&self, window: ChatWindow) {
            self.script.lock().unwrap().windows.insert(window, None);
        }

        pub fn set_created(&self, chat_id: &str, title: Option<&str>) {
            self.script.lock().unwrap().created = Some(CreatedChat {
                chat_id: chat_id.to_string(),
                title: title.map(str::to_string),
            });
        }

        pub fn set_delay(&self, delay: Duration) {
            self.script.lock().unwrap().delay = delay;
        }

        pub fn fetch_calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }

        pub fn create_calls(&self) -> usize {
            self.create_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn fetch_window(&self, window: ChatWindow) -> Result<Vec<Conversation>, ApiError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let (reply, delay) = {
                let script = self.script.lock().unwrap();
                let reply = script.windows.get(&window).cloned().unwrap_or(Some(Vec::new()));
                (reply, script.delay)
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            reply.ok_or(ApiError::Status(503))
        }

        async fn create_chat(&self, _content: &str) -> Result<CreatedChat, ApiError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let (created, delay) = {
                let script = self.script.lock().unwrap();
                (script.created.clone(), script.delay)
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            created.ok_or(ApiError::Status(500))
        }
    }
}
