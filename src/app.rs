use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::api::client::ApiClient;
use crate::api::ChatBackend;
use crate::chats::{CreationCoordinator, FailurePolicy};
use crate::error::{ApiError, ConfigError};
use crate::storage::{CachePolicy, ChatCache};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    /// Backend serving the chat list endpoints.
    pub base_url: String,
    /// Web origin used for shareable chat links.
    pub origin: String,
    pub retries: u32,
    pub retry_base_delay_ms: u64,
    pub stale_after_secs: u64,
    pub reconcile_delay_ms: u64,
    pub failure_policy: FailurePolicy,
    pub new_chat_prompt: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            origin: "http://localhost:5173".to_string(),
            retries: 2,
            retry_base_delay_ms: 1000,
            stale_after_secs: 60,
            reconcile_delay_ms: 500,
            failure_policy: FailurePolicy::AllOrNothing,
            new_chat_prompt: crate::chats::coordinator::DEFAULT_PROMPT.to_string(),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("chatlist.toml"))
    }

    /// Load from the default location. A missing or unreadable file yields
    /// the defaults.
    pub fn load() -> Self {
        match Self::toml_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("Ignoring config {}: {}", path.display(), e);
                Self::new()
            }),
            _ => Self::new(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::toml_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            retries: self.retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            stale_after: Duration::from_secs(self.stale_after_secs),
            failure_policy: self.failure_policy,
        }
    }
}

/// The session's chat list: one cache and the coordinator writing into it.
pub struct ChatSession {
    pub cache: Arc<ChatCache>,
    pub coordinator: CreationCoordinator,
}

impl ChatSession {
    pub fn new(state: &AppState, backend: Arc<dyn ChatBackend>) -> Self {
        let cache = Arc::new(ChatCache::new(backend.clone(), state.cache_policy()));
        let coordinator = CreationCoordinator::new(
            backend,
            cache.clone(),
            Duration::from_millis(state.reconcile_delay_ms),
        )
        .with_prompt(state.new_chat_prompt.clone());
        Self { cache, coordinator }
    }

    pub fn connect(state: &AppState) -> Result<Self, ApiError> {
        let client = ApiClient::new(&state.base_url)?;
        Ok(Self::new(state, Arc::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatlist.toml");
        fs::write(&path, "base_url = \"http://backend:9000\"\nfailure_policy = \"partial\"\n").unwrap();

        let state = AppState::load_from(&path).unwrap();
        assert_eq!(state.base_url, "http://backend:9000");
        assert_eq!(state.failure_policy, FailurePolicy::Partial);
        assert_eq!(state.retries, 2);
        assert_eq!(state.reconcile_delay_ms, 500);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chatlist.toml");
        let mut state = AppState::new();
        state.stale_after_secs = 5;
        state.save_to(&path).unwrap();
        assert_eq!(AppState::load_from(&path).unwrap(), state);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatlist.toml");
        fs::write(&path, "retries = \"many\"").unwrap();
        assert!(matches!(AppState::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn policy_from_state() {
        let policy = AppState::new().cache_policy();
        assert_eq!(policy, CachePolicy::default());
    }
}
