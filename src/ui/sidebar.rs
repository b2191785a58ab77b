use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};

use crate::api::models::Conversation;
use crate::chats::bucketize;
use crate::storage::CacheStatus;
use crate::utils::share_url;

pub const LOADING: &str = "Loading chats...";
pub const NO_CHATS: &str = "No chats yet. Click \"New Chat\" to start!";

/// Plain-text conversation list, grouped by date.
pub struct Sidebar {
    origin: Option<String>,
}

impl Sidebar {
    pub fn new() -> Self {
        Self { origin: None }
    }

    /// Print a share link under each conversation.
    pub fn with_links(origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
        }
    }

    pub fn render<Tz: TimeZone>(
        &self,
        chats: &[Conversation],
        status: CacheStatus,
        now: &DateTime<Tz>,
    ) -> String {
        let mut out = String::new();
        if status == CacheStatus::Loading {
            let _ = writeln!(out, "{}", LOADING);
        }

        let buckets = bucketize(chats, now);
        let sections = [
            ("Today", &buckets.today),
            ("Yesterday", &buckets.yesterday),
            ("Last 7 Days", &buckets.last_seven_days),
        ];
        for (heading, items) in sections.iter().filter(|(_, items)| !items.is_empty()) {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "{} ({})", heading, items.len());
            for conv in items.iter() {
                self.render_row(&mut out, conv);
            }
        }

        if status != CacheStatus::Loading && chats.is_empty() {
            let _ = writeln!(out, "{}", NO_CHATS);
        }
        out
    }

    fn render_row(&self, out: &mut String, conv: &Conversation) {
        let _ = write!(out, "  {}", conv.display_title());
        if let Some(count) = conv.message_count_label() {
            let _ = write!(out, " {}", count);
        }
        out.push('\n');
        if let Some(origin) = &self.origin {
            if let Ok(url) = share_url(origin, &conv.id) {
                let _ = writeln!(out, "    {}", url);
            }
        }
    }
}

impl Default for Sidebar {
    fn default() -> Self {
        Self::new()
    }
}
