use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::api::models::{ChatWindow, Conversation};
use crate::api::ChatBackend;
use crate::chats::merge::merge;
use crate::error::FetchError;

/// What to do when some of the three list requests fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failing window fails the whole aggregation.
    #[default]
    AllOrNothing,
    /// Keep the windows that answered; fail only if none did.
    Partial,
}

/// Fetches all three windows concurrently and merges them.
pub async fn try_fetch_all(
    backend: &dyn ChatBackend,
    policy: FailurePolicy,
) -> Result<Vec<Conversation>, FetchError> {
    let (today, yesterday, seven_days) = tokio::join!(
        backend.fetch_window(ChatWindow::Today),
        backend.fetch_window(ChatWindow::Yesterday),
        backend.fetch_window(ChatWindow::SevenDays),
    );

    let mut lists = Vec::with_capacity(ChatWindow::ALL.len());
    let mut first_error = None;
    for (window, result) in ChatWindow::ALL.into_iter().zip([today, yesterday, seven_days]) {
        match result {
            Ok(list) => lists.push(list),
            Err(source) => {
                warn!("Error fetching {} chats: {}", window, source);
                if first_error.is_none() {
                    first_error = Some(FetchError::Source { window, source });
                }
            }
        }
    }

    match (policy, first_error) {
        (FailurePolicy::AllOrNothing, Some(err)) => Err(err),
        (FailurePolicy::Partial, Some(err)) if lists.is_empty() => Err(err),
        _ => {
            let merged = merge(lists);
            debug!("Fetched {} unique chats", merged.len());
            Ok(merged)
        }
    }
}

/// Like [`try_fetch_all`] but never fails: an aggregation that cannot be
/// completed yields an empty list.
pub async fn fetch_all(backend: &dyn ChatBackend, policy: FailurePolicy) -> Vec<Conversation> {
    try_fetch_all(backend, policy).await.unwrap_or_else(|e| {
        warn!("Error fetching chats: {}", e);
        Vec::new()
    })
}
