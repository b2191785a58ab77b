//! The in-memory chat list cache.
//!
//! One entry holds the merged conversation list for the session. Fetches
//! replace it wholesale; the only finer mutation is prepending a conversation
//! that was just created. Every write carries a ticket taken when the write
//! began, and a fetch result is dropped if a newer write has already landed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::watch;

use crate::api::models::Conversation;
use crate::api::ChatBackend;
use crate::chats::fetcher::{try_fetch_all, FailurePolicy};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Extra attempts after a failed aggregation.
    pub retries: u32,
    /// First retry delay; doubles on each further attempt.
    pub retry_base_delay: Duration,
    /// How long a fetched list is served without refetching.
    pub stale_after: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_base_delay: Duration::from_secs(1),
            stale_after: Duration::from_secs(60),
            failure_policy: FailurePolicy::AllOrNothing,
        }
    }
}

impl CachePolicy {
    fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(MAX_RETRY_DELAY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Nothing fetched yet.
    Idle,
    /// First fetch in flight.
    Loading,
    Ready,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub chats: Arc<Vec<Conversation>>,
    pub status: CacheStatus,
    fetched_at: Option<Instant>,
    applied: u64,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            chats: Arc::new(Vec::new()),
            status: CacheStatus::Idle,
            fetched_at: None,
            applied: 0,
        }
    }
}

pub struct ChatCache {
    backend: Arc<dyn ChatBackend>,
    policy: CachePolicy,
    entry: watch::Sender<CacheEntry>,
    tickets: AtomicU64,
}

impl ChatCache {
    pub const KEY: &'static str = "allChats";

    pub fn new(backend: Arc<dyn ChatBackend>, policy: CachePolicy) -> Self {
        let (entry, _) = watch::channel(CacheEntry::default());
        Self {
            backend,
            policy,
            entry,
            tickets: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// The current list, without touching the network.
    pub fn snapshot(&self) -> Vec<Conversation> {
        self.entry.borrow().chats.as_ref().clone()
    }

    pub fn status(&self) -> CacheStatus {
        self.entry.borrow().status
    }

    /// Observe every change to the entry.
    pub fn subscribe(&self) -> watch::Receiver<CacheEntry> {
        self.entry.subscribe()
    }

    pub fn is_stale(&self) -> bool {
        match self.entry.borrow().fetched_at {
            Some(at) => at.elapsed() >= self.policy.stale_after,
            None => true,
        }
    }

    /// Serve the cached list, fetching first if it is missing or stale.
    pub async fn read(&self) -> Vec<Conversation> {
        if !self.is_stale() {
            return self.snapshot();
        }
        self.refresh().await
    }

    /// Refetch and replace the whole list, dropping provisional entries the
    /// backend does not know about yet.
    pub async fn reconcile(&self) -> Vec<Conversation> {
        self.refresh().await
    }

    /// Make the next [`read`](Self::read) refetch.
    pub fn invalidate(&self) {
        self.entry.send_if_modified(|entry| {
            entry.fetched_at = None;
            false
        });
    }

    /// Put a conversation at the head of the list before the backend lists
    /// it. An existing entry with the same id is replaced.
    pub fn optimistic_insert(&self, conv: Conversation) {
        let ticket = self.next_ticket();
        debug!("Optimistic insert of chat {}", conv.id);
        self.entry.send_modify(|entry| {
            let mut chats = Vec::with_capacity(entry.chats.len() + 1);
            chats.extend(entry.chats.iter().filter(|c| c.id != conv.id).cloned());
            chats.insert(0, conv);
            entry.chats = Arc::new(chats);
            entry.fetched_at = Some(Instant::now());
            entry.applied = ticket;
        });
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn refresh(&self) -> Vec<Conversation> {
        let ticket = self.next_ticket();
        let started_loading = self.entry.send_if_modified(|entry| {
            if entry.status == CacheStatus::Idle {
                entry.status = CacheStatus::Loading;
                true
            } else {
                false
            }
        });

        let mut guard = FirstLoad {
            entry: &self.entry,
            armed: started_loading,
        };
        let mut fetched = Some(self.fetch_with_retry().await);
        guard.armed = false;
        self.entry.send_if_modified(|entry| {
            if ticket <= entry.applied {
                warn!("Dropping stale chat list (fetch {} < write {})", ticket, entry.applied);
                let was_loading = entry.status == CacheStatus::Loading;
                entry.status = CacheStatus::Ready;
                return was_loading;
            }
            let chats = fetched.take().unwrap_or_default();
            debug!("Cache {} replaced with {} chats", Self::KEY, chats.len());
            entry.chats = Arc::new(chats);
            entry.status = CacheStatus::Ready;
            entry.fetched_at = Some(Instant::now());
            entry.applied = ticket;
            true
        });
        self.snapshot()
    }

    async fn fetch_with_retry(&self) -> Vec<Conversation> {
        let mut attempt = 0;
        loop {
            match try_fetch_all(self.backend.as_ref(), self.policy.failure_policy).await {
                Ok(chats) => return chats,
                Err(e) if attempt < self.policy.retries => {
                    let delay = self.policy.retry_delay(attempt);
                    warn!(
                        "Chat list fetch failed (attempt {}): {}; retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Chat list unavailable after {} attempts: {}", attempt + 1, e);
                    return Vec::new();
                }
            }
        }
    }
}

/// Puts a first load that never finished back to `Idle`.
struct FirstLoad<'a> {
    entry: &'a watch::Sender<CacheEntry>,
    armed: bool,
}

impl Drop for FirstLoad<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!("First chat list load abandoned");
        self.entry.send_if_modified(|entry| {
            if entry.status == CacheStatus::Loading {
                entry.status = CacheStatus::Idle;
                true
            } else {
                false
            }
        });
    }
}
