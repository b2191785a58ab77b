use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const UNTITLED_CHAT: &str = "Untitled Chat";
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// One chat thread as listed by the backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

impl Conversation {
    /// Title as it should be shown in the list. The stored title is left as is.
    pub fn display_title(&self) -> String {
        normalize_title(&self.title)
    }

    /// `"(n)"` for a positive message count, nothing otherwise.
    pub fn message_count_label(&self) -> Option<String> {
        match self.message_count {
            Some(n) if n > 0 => Some(format!("({})", n)),
            _ => None,
        }
    }
}

/// Trims the title and strips one layer of matching `"` or `'` quotes,
/// trimming again inside them. Blank titles become [`UNTITLED_CHAT`].
pub fn normalize_title(title: &str) -> String {
    let t = title.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| t.strip_prefix(*q).and_then(|rest| rest.strip_suffix(*q)))
        .unwrap_or(t)
        .trim();
    if unquoted.is_empty() {
        UNTITLED_CHAT.to_string()
    } else {
        unquoted.to_string()
    }
}

/// The three list endpoints, in the order their results are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatWindow {
    Today,
    Yesterday,
    SevenDays,
}

impl ChatWindow {
    pub const ALL: [ChatWindow; 3] = [ChatWindow::Today, ChatWindow::Yesterday, ChatWindow::SevenDays];

    pub fn path(self) -> &'static str {
        match self {
            ChatWindow::Today => "todays_chats/",
            ChatWindow::Yesterday => "yesterdays_chats/",
            ChatWindow::SevenDays => "seven_days_chats/",
        }
    }
}

impl fmt::Display for ChatWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChatWindow::Today => "today's",
            ChatWindow::Yesterday => "yesterday's",
            ChatWindow::SevenDays => "last 7 days'",
        };
        f.write_str(name)
    }
}

/// Body of `POST /prompt_gpt/`.
#[derive(Debug, Serialize)]
pub struct PromptRequest<'a> {
    pub chat_id: &'a str,
    pub content: &'a str,
}

impl<'a> PromptRequest<'a> {
    pub fn new_chat(content: &'a str) -> Self {
        Self { chat_id: "new", content }
    }
}

/// What the backend returns after starting a conversation.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CreatedChat {
    pub chat_id: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl CreatedChat {
    pub fn title_or_default(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => NEW_CHAT_TITLE,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses RFC 3339, or an ISO timestamp without offset.
///
/// Offset-less timestamps are wall-clock times in the local zone, the same
/// zone the sidebar buckets in. A time skipped by a DST jump is rejected; an
/// ambiguous one takes the earlier instant.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|ts| ts.with_timezone(&Utc))
}

mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_one_layer_of_quotes() {
        assert_eq!(normalize_title("\"Hello\""), "Hello");
        assert_eq!(normalize_title("'Hello'"), "Hello");
        assert_eq!(normalize_title("Hello"), "Hello");
        assert_eq!(normalize_title("  \"Hi there\"  "), "Hi there");
        assert_eq!(normalize_title("\"Hello'"), "\"Hello'");
        assert_eq!(normalize_title("\" Hi \""), "Hi");
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        for raw in ["\"Hello\"", "Hello", "  padded ", "", "'x'", "\"", "\" Hi \"", "' x'"] {
            let once = normalize_title(raw);
            assert_eq!(normalize_title(&once), once, "input {:?}", raw);
        }
    }

    #[test]
    fn blank_titles_are_untitled() {
        assert_eq!(normalize_title(""), UNTITLED_CHAT);
        assert_eq!(normalize_title("   "), UNTITLED_CHAT);
        assert_eq!(normalize_title("\"\""), UNTITLED_CHAT);
    }

    #[test]
    fn display_title_leaves_stored_title_alone() {
        let conv: Conversation = serde_json::from_value(serde_json::json!({
            "id": "a",
            "title": "\"Quoted\"",
            "created_at": "2024-03-10T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(conv.display_title(), "Quoted");
        assert_eq!(conv.title, "\"Quoted\"");
    }

    #[test]
    fn message_count_label_hides_zero_and_missing() {
        let mut conv: Conversation = serde_json::from_value(serde_json::json!({
            "id": "a",
            "title": null,
            "created_at": "2024-03-10T09:00:00"
        }))
        .unwrap();
        assert_eq!(conv.title, "");
        assert_eq!(conv.message_count_label(), None);
        conv.message_count = Some(0);
        assert_eq!(conv.message_count_label(), None);
        conv.message_count = Some(4);
        assert_eq!(conv.message_count_label().as_deref(), Some("(4)"));
    }

    #[test]
    fn accepts_timestamps_with_and_without_offset() {
        let expected = DateTime::parse_from_rfc3339("2024-03-10T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_timestamp("2024-03-10T09:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T11:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn offset_less_timestamps_are_local_wall_clock() {
        let naive = NaiveDateTime::parse_from_str("2024-03-10 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let local = Local.from_local_datetime(&naive).earliest().unwrap().with_timezone(&Utc);
        assert_eq!(parse_timestamp("2024-03-10T09:00:00"), Some(local));
        assert_eq!(parse_timestamp("2024-03-10 09:00:00.000"), Some(local));
        assert_eq!(
            parse_timestamp("2024-03-10T09:00:00").map(|ts| ts.with_timezone(&Local).naive_local()),
            Some(naive)
        );
    }

    #[test]
    fn created_chat_falls_back_to_new_chat_title() {
        let created: CreatedChat = serde_json::from_str(r#"{"chat_id":"42"}"#).unwrap();
        assert_eq!(created.title_or_default(), NEW_CHAT_TITLE);
        let created: CreatedChat = serde_json::from_str(r#"{"chat_id":"42","title":""}"#).unwrap();
        assert_eq!(created.title_or_default(), NEW_CHAT_TITLE);
        let created: CreatedChat = serde_json::from_str(r#"{"chat_id":"42","title":"Rust"}"#).unwrap();
        assert_eq!(created.title_or_default(), "Rust");
    }
}
