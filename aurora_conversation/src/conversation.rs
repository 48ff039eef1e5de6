//! A single conversation: its bounded turn window plus display metadata.
//!
//! The window only ever grows at the back and shrinks at the front, so the
//! retained turns are always the most recent `max_turns` in arrival order.

use std::collections::VecDeque;

use aurora_core::{Role, Turn};
use aurora_core::util::truncate_with_ellipsis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown for a conversation until its first user turn arrives.
pub const NEW_CHAT_TITLE: &str = "New Chat";

const TITLE_MAX_CHARS: usize = 30;
const PREVIEW_MAX_CHARS: usize = 50;

/// Listing metadata for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    /// Every turn ever appended, including evicted ones
    pub message_count: usize,
    pub last_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    id: String,
    turns: VecDeque<Turn>,
    max_turns: usize,
    title: Option<String>,
    message_count: usize,
    last_message: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Conversation {
    #[must_use]
    pub fn new(id: impl Into<String>, max_turns: usize) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            turns: VecDeque::with_capacity(max_turns.min(64)),
            max_turns,
            title: None,
            message_count: 0,
            last_message: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn, evicting from the front until the window fits.
    ///
    /// Returns the number of evicted turns.
    pub fn push(&mut self, turn: Turn) -> usize {
        if self.title.is_none() && turn.role == Role::User {
            self.title = Some(truncate_with_ellipsis(&turn.text, TITLE_MAX_CHARS));
        }
        self.last_message = truncate_with_ellipsis(&turn.text, PREVIEW_MAX_CHARS);
        self.message_count += 1;
        self.updated_at = Utc::now();

        self.turns.push_back(turn);

        let mut evicted = 0;
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
            evicted += 1;
        }
        evicted
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn turns(&self) -> &VecDeque<Turn> {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self
                .title
                .clone()
                .unwrap_or_else(|| NEW_CHAT_TITLE.to_string()),
            message_count: self.message_count,
            last_message: self.last_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_evicts_oldest_first() {
        let mut conversation = Conversation::new("c", 3);

        for i in 0..5 {
            conversation.push(Turn::user(format!("Message {i}")));
        }

        let texts: Vec<&str> = conversation.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["Message 2", "Message 3", "Message 4"]);
        assert_eq!(conversation.summary().message_count, 5);
    }

    #[test]
    fn test_push_reports_evictions() {
        let mut conversation = Conversation::new("c", 1);
        assert_eq!(conversation.push(Turn::user("a")), 0);
        assert_eq!(conversation.push(Turn::assistant("b")), 1);
        assert_eq!(conversation.turns()[0].role, Role::Assistant);
    }

    #[test]
    fn test_title_from_first_user_turn() {
        let mut conversation = Conversation::new("c", 20);
        assert_eq!(conversation.summary().title, NEW_CHAT_TITLE);

        conversation.push(Turn::assistant("Welcome!"));
        assert_eq!(conversation.summary().title, NEW_CHAT_TITLE);

        conversation.push(Turn::user("How do I budget for a holiday in Japan next spring?"));
        conversation.push(Turn::user("Second question"));

        let summary = conversation.summary();
        assert_eq!(summary.title, "How do I budget for a holiday ...");
        assert_eq!(summary.last_message, "Second question");
    }

    #[test]
    fn test_last_message_preview_truncated() {
        let mut conversation = Conversation::new("c", 20);
        conversation.push(Turn::assistant("x".repeat(80)));

        let summary = conversation.summary();
        assert_eq!(summary.last_message.len(), 53);
        assert!(summary.last_message.ends_with("..."));
    }
}
