use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client as HttpClient;
use serde_json::Value;
use url::Url;

use crate::api::models::{ChatWindow, Conversation, CreatedChat, PromptRequest};
use crate::api::ChatBackend;
use crate::error::ApiError;

pub struct ApiClient {
    pub http: HttpClient,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http: HttpClient::new(),
            base: Self::base_api(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // Endpoints are joined relative to the base, so it must end with a slash.
    fn base_api(base_url: &str) -> Result<Url, ApiError> {
        let trimmed = crate::utils::normalize_url(base_url);
        let trimmed = trimmed.trim_end_matches('/');
        Ok(Url::parse(&format!("{}/", trimmed))?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    /// Fetch one time window of conversations.
    /// A body that is not a JSON array counts as an empty list, and items that
    /// do not look like a conversation are skipped.
    pub async fn chats(&self, window: ChatWindow) -> Result<Vec<Conversation>, ApiError> {
        let endpoint = self.endpoint(window.path())?;
        let resp = self.http.get(endpoint).send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        Ok(parse_conversations(window, &body))
    }

    /// Start a new conversation with an opening prompt.
    pub async fn prompt_new_chat(&self, content: &str) -> Result<CreatedChat, ApiError> {
        let endpoint = self.endpoint("prompt_gpt/")?;
        let resp = self
            .http
            .post(endpoint)
            .json(&PromptRequest::new_chat(content))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        let json: Value = resp
            .json()
            .await
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
        let created: CreatedChat = serde_json::from_value(json)
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
        if created.chat_id.is_empty() {
            return Err(ApiError::MalformedResponse("No chat_id in response".into()));
        }
        Ok(created)
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn fetch_window(&self, window: ChatWindow) -> Result<Vec<Conversation>, ApiError> {
        self.chats(window).await
    }

    async fn create_chat(&self, content: &str) -> Result<CreatedChat, ApiError> {
        self.prompt_new_chat(content).await
    }
}

pub(crate) fn parse_conversations(window: ChatWindow, body: &str) -> Vec<Conversation> {
    let items = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            warn!("{} chats: expected a list, got {}", window, kind_of(&other));
            return Vec::new();
        }
        Err(e) => {
            warn!("{} chats: unreadable body: {}", window, e);
            return Vec::new();
        }
    };

    let total = items.len();
    let out: Vec<Conversation> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Conversation>(item) {
            Ok(conv) => Some(conv),
            Err(e) => {
                warn!("{} chats: skipping malformed entry: {}", window, e);
                None
            }
        })
        .collect();
    debug!("{} chats: {} of {} entries usable", window, out.len(), total);
    out
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_list_bodies_are_empty() {
        assert!(parse_conversations(ChatWindow::Today, r#"{"detail":"oops"}"#).is_empty());
        assert!(parse_conversations(ChatWindow::Today, "null").is_empty());
        assert!(parse_conversations(ChatWindow::Today, "<html>").is_empty());
        assert!(parse_conversations(ChatWindow::Today, "").is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let body = r#"[
            {"id": "a", "title": "ok", "created_at": "2024-03-10T09:00:00Z", "message_count": 3},
            {"title": "no id", "created_at": "2024-03-10T09:00:00Z"},
            {"id": "b", "title": "bad date", "created_at": "not a date"},
            42
        ]"#;
        let convs = parse_conversations(ChatWindow::Yesterday, body);
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].id, "a");
        assert_eq!(convs[0].message_count, Some(3));
    }

    #[test]
    fn base_url_gets_trailing_slash_and_scheme() {
        let client = ApiClient::new("127.0.0.1:8000").unwrap();
        assert_eq!(client.base_url().as_str(), "https://127.0.0.1:8000/");
        let client = ApiClient::new("http://host/api/").unwrap();
        assert_eq!(
            client.endpoint(ChatWindow::SevenDays.path()).unwrap().as_str(),
            "http://host/api/seven_days_chats/"
        );
    }
}
