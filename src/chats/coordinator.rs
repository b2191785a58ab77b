use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::models::{Conversation, CreatedChat};
use crate::api::ChatBackend;
use crate::error::CreationError;
use crate::events::SidebarEvent;
use crate::storage::ChatCache;
use crate::utils::chat_route;

pub const DEFAULT_PROMPT: &str = "Hello, let's start a new conversation";
pub const CREATION_FAILED_ALERT: &str = "Failed to create chat. Check the server.";
/// A new conversation starts with the opening prompt and its reply.
const INITIAL_MESSAGE_COUNT: u32 = 2;

/// Starts conversations on the backend and keeps the cached list in step.
pub struct CreationCoordinator {
    backend: Arc<dyn ChatBackend>,
    cache: Arc<ChatCache>,
    events: broadcast::Sender<SidebarEvent>,
    prompt: String,
    reconcile_delay: Duration,
    pending_reconcile: Mutex<Option<JoinHandle<()>>>,
    in_flight: AtomicUsize,
}

impl CreationCoordinator {
    pub fn new(backend: Arc<dyn ChatBackend>, cache: Arc<ChatCache>, reconcile_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            backend,
            cache,
            events,
            prompt: DEFAULT_PROMPT.to_string(),
            reconcile_delay,
            pending_reconcile: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SidebarEvent> {
        self.events.subscribe()
    }

    /// True while a create request is waiting on the backend.
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Create a conversation, show it at the top of the list right away and
    /// reconcile with the backend after the configured delay.
    ///
    /// Must be called within a Tokio runtime; the reconcile runs as a spawned task.
    pub async fn create_conversation(&self) -> Result<CreatedChat, CreationError> {
        let result = {
            let _guard = InFlight::enter(&self.in_flight);
            self.backend.create_chat(&self.prompt).await
        };
        let created = match result {
            Ok(created) => created,
            Err(e) => {
                error!("Error creating chat: {}", e);
                let _ = self.events.send(SidebarEvent::CreationFailed {
                    message: CREATION_FAILED_ALERT.to_string(),
                });
                return Err(CreationError(e));
            }
        };

        info!("Created chat {}", created.chat_id);
        self.cache.optimistic_insert(Conversation {
            id: created.chat_id.clone(),
            title: created.title_or_default().to_string(),
            created_at: Utc::now(),
            message_count: Some(INITIAL_MESSAGE_COUNT),
            last_message: None,
        });
        let _ = self.events.send(SidebarEvent::Navigate {
            chat_id: created.chat_id.clone(),
            route: chat_route(&created.chat_id),
        });
        self.schedule_reconcile();
        Ok(created)
    }

    /// Replaces any reconcile that has not run yet.
    fn schedule_reconcile(&self) {
        let cache = Arc::clone(&self.cache);
        let delay = self.reconcile_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            cache.reconcile().await;
        });
        if let Some(previous) = self.pending().replace(handle) {
            if !previous.is_finished() {
                debug!("Superseding pending reconcile");
            }
            previous.abort();
        }
    }

    pub fn cancel_pending_reconcile(&self) {
        if let Some(handle) = self.pending().take() {
            handle.abort();
        }
    }

    /// Wait for the scheduled reconcile, if any, to finish.
    pub async fn settle(&self) {
        let handle = self.pending().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending_reconcile.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CreationCoordinator {
    fn drop(&mut self) {
        self.cancel_pending_reconcile();
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
