//! In-memory, per-conversation bounded history.
//!
//! Uses a two-level lock: the outer `RwLock` guards the id → conversation
//! map, and each conversation carries its own `RwLock`. Appends to one
//! conversation serialize on that conversation's lock, while appends to
//! different conversations only share the outer read lock.
//!
//! Every mutation happens under a single write guard, so a reader never
//! observes half of an append (or half of an exchange).

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use aurora_core::{ContextConfig, Role, Turn};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conversation::{Conversation, ConversationSummary};
use crate::export::{ExportSnapshot, ExportedConversation};
use crate::prompt::render_prompt;

type ConversationMap = HashMap<String, RwLock<Conversation>>;

// The guarded data is never left half-updated, so a poisoned lock is still
// safe to use.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// A turn matched by [`ConversationContextStore::search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Position inside the retained window (0 = oldest retained turn)
    pub index: usize,
    pub turn: Turn,
}

/// Bounded rolling window of turns for every tracked conversation.
///
/// Conversations are created on first append and live until removed or
/// the store is dropped. Nothing is persisted.
#[derive(Debug)]
pub struct ConversationContextStore {
    config: ContextConfig,
    conversations: RwLock<ConversationMap>,
}

impl ConversationContextStore {
    #[must_use]
    pub fn new(config: ContextConfig) -> Self {
        info!(
            "Creating conversation context store (max_turns={})",
            config.max_turns
        );
        Self {
            config,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Append a turn to `conversation_id`, creating the conversation if it
    /// does not exist yet. Oldest turns are evicted once the window is full.
    ///
    /// `conversation_id` is expected to be non-empty.
    pub fn append(&self, conversation_id: &str, role: Role, text: impl Into<String>) {
        let turn = Turn::new(role, text);
        self.with_conversation_mut(conversation_id, |conversation| {
            let evicted = conversation.push(turn);
            if evicted > 0 {
                debug!("Evicted {evicted} turn(s) from conversation {conversation_id}");
            }
        });
    }

    /// Append a user turn and its assistant reply as one atomic step.
    pub fn append_exchange(
        &self,
        conversation_id: &str,
        user_text: impl Into<String>,
        assistant_text: impl Into<String>,
    ) {
        let user = Turn::user(user_text);
        let assistant = Turn::assistant(assistant_text);
        self.with_conversation_mut(conversation_id, |conversation| {
            let evicted = conversation.push(user) + conversation.push(assistant);
            if evicted > 0 {
                debug!("Evicted {evicted} turn(s) from conversation {conversation_id}");
            }
        });
    }

    /// Render the stored history of `conversation_id` followed by
    /// `new_message`. Does not modify the history.
    ///
    /// An unknown or empty conversation renders as `new_message` alone.
    #[must_use]
    pub fn build_prompt(&self, conversation_id: &str, new_message: &str) -> String {
        self.with_conversation(conversation_id, |conversation| {
            render_prompt(&self.config.template, conversation.turns(), new_message)
        })
        .unwrap_or_else(|| new_message.to_string())
    }

    /// Snapshot of the retained turns, oldest first.
    #[must_use]
    pub fn turns(&self, conversation_id: &str) -> Vec<Turn> {
        self.with_conversation(conversation_id, |conversation| {
            conversation.turns().iter().cloned().collect()
        })
        .unwrap_or_default()
    }

    /// Number of retained turns (0 for unknown conversations).
    #[must_use]
    pub fn len(&self, conversation_id: &str) -> usize {
        self.with_conversation(conversation_id, Conversation::len)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, conversation_id: &str) -> bool {
        read_lock(&self.conversations).contains_key(conversation_id)
    }

    #[must_use]
    pub fn conversation_count(&self) -> usize {
        read_lock(&self.conversations).len()
    }

    #[must_use]
    pub fn summary(&self, conversation_id: &str) -> Option<ConversationSummary> {
        self.with_conversation(conversation_id, Conversation::summary)
    }

    /// Summaries of every conversation, most recently updated first.
    #[must_use]
    pub fn list_summaries(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = read_lock(&self.conversations)
            .values()
            .map(|conversation| read_lock(conversation).summary())
            .collect();
        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }

    /// Case-insensitive substring search over the retained turns of one
    /// conversation, newest match first. A blank query matches nothing.
    #[must_use]
    pub fn search(&self, conversation_id: &str, query: &str) -> Vec<SearchHit> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        self.with_conversation(conversation_id, |conversation| {
            conversation
                .turns()
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, turn)| turn.text.to_lowercase().contains(&query))
                .map(|(index, turn)| SearchHit {
                    index,
                    turn: turn.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
    }

    /// Drop a whole conversation. Returns whether it existed.
    pub fn remove(&self, conversation_id: &str) -> bool {
        let removed = write_lock(&self.conversations)
            .remove(conversation_id)
            .is_some();
        if removed {
            info!("Removed conversation: {conversation_id}");
        }
        removed
    }

    /// Drop every conversation.
    pub fn clear(&self) {
        let mut conversations = write_lock(&self.conversations);
        let count = conversations.len();
        conversations.clear();
        info!("Cleared {count} conversation(s)");
    }

    /// Serializable copy of everything the store holds.
    #[must_use]
    pub fn export(&self) -> ExportSnapshot {
        let conversations = read_lock(&self.conversations);
        let mut exported: Vec<ExportedConversation> = conversations
            .values()
            .map(|conversation| {
                let conversation = read_lock(conversation);
                ExportedConversation {
                    summary: conversation.summary(),
                    turns: conversation.turns().iter().cloned().collect(),
                }
            })
            .collect();
        drop(conversations);

        exported.sort_by(|a, b| {
            b.summary
                .updated_at
                .cmp(&a.summary.updated_at)
                .then_with(|| a.summary.id.cmp(&b.summary.id))
        });
        ExportSnapshot::new(exported)
    }

    fn with_conversation<R>(
        &self,
        conversation_id: &str,
        f: impl FnOnce(&Conversation) -> R,
    ) -> Option<R> {
        read_lock(&self.conversations)
            .get(conversation_id)
            .map(|conversation| f(&*read_lock(conversation)))
    }

    /// Get-or-create. The map lock is held for the duration of `f` so a
    /// concurrent `remove` cannot orphan the write.
    fn with_conversation_mut<R>(
        &self,
        conversation_id: &str,
        f: impl FnOnce(&mut Conversation) -> R,
    ) -> R {
        {
            let conversations = read_lock(&self.conversations);
            if let Some(conversation) = conversations.get(conversation_id) {
                let mut conversation = write_lock(conversation);
                return f(&mut *conversation);
            }
        }

        let mut conversations = write_lock(&self.conversations);
        let conversation = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                debug!("Creating conversation: {conversation_id}");
                RwLock::new(Conversation::new(conversation_id, self.config.max_turns))
            });
        let mut conversation = write_lock(conversation);
        f(&mut *conversation)
    }
}

impl Default for ConversationContextStore {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(store: &ConversationContextStore, id: &str, count: usize) {
        for i in 0..count {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append(id, role, format!("turn {i}"));
        }
    }

    #[test]
    fn test_unknown_conversation_prompt_is_raw() {
        let store = ConversationContextStore::default();
        assert_eq!(store.build_prompt("unknown-conv", "Hi"), "Hi");
        assert!(!store.contains("unknown-conv"));
    }

    #[test]
    fn test_window_keeps_most_recent_turns() {
        let store = ConversationContextStore::default();
        alternating(&store, "c1", 21);

        let turns = store.turns("c1");
        assert_eq!(turns.len(), 20);
        assert_eq!(turns[0].text, "turn 1");
        assert_eq!(turns[0].role, Role::Assistant);
        assert_eq!(turns[19].text, "turn 20");
    }

    #[test]
    fn test_fifo_eviction_drops_former_head() {
        let store = ConversationContextStore::new(ContextConfig::default().with_max_turns(4));
        alternating(&store, "c", 4);
        let before = store.turns("c");

        store.append("c", Role::User, "newest");

        let after = store.turns("c");
        assert_eq!(after.len(), 4);
        assert_eq!(after[0], before[1]);
        assert_eq!(after[3].text, "newest");
    }

    #[test]
    fn test_prompt_renders_history_in_order() {
        let store = ConversationContextStore::default();
        store.append("c2", Role::User, "Hello");
        store.append("c2", Role::Assistant, "Hi there");

        let prompt = store.build_prompt("c2", "How are you?");
        let lines: Vec<&str> = prompt.lines().collect();

        assert_eq!(
            lines,
            [
                "Here is our previous conversation:",
                "User: Hello",
                "Assistant: Hi there",
                "",
                "User: How are you?",
                "",
                "Assistant:",
            ]
        );
    }

    #[test]
    fn test_build_prompt_is_idempotent_and_read_only() {
        let store = ConversationContextStore::default();
        store.append("c", Role::User, "Hello");

        let first = store.build_prompt("c", "Again");
        let second = store.build_prompt("c", "Again");

        assert_eq!(first, second);
        assert_eq!(store.len("c"), 1);
    }

    #[test]
    fn test_append_exchange_adds_both_sides() {
        let store = ConversationContextStore::default();
        store.append_exchange("c", "question", "answer");

        assert_eq!(
            store.turns("c"),
            [Turn::user("question"), Turn::assistant("answer")]
        );
    }

    #[test]
    fn test_empty_text_is_accepted() {
        let store = ConversationContextStore::default();
        store.append("c", Role::User, "");

        assert_eq!(store.len("c"), 1);
        assert_ne!(store.build_prompt("c", "next"), "next");
    }

    #[test]
    fn test_search_newest_first_case_insensitive() {
        let store = ConversationContextStore::default();
        store.append("c", Role::User, "What is an ETF?");
        store.append("c", Role::Assistant, "An exchange-traded fund.");
        store.append("c", Role::User, "Are etfs risky?");

        let hits = store.search("c", "etf");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 2);
        assert_eq!(hits[1].index, 0);
        assert!(store.search("c", "   ").is_empty());
        assert!(store.search("missing", "etf").is_empty());
    }

    #[test]
    fn test_summaries_most_recent_first() {
        let store = ConversationContextStore::default();
        store.append("older", Role::User, "first");
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.append("newer", Role::User, "second");

        let summaries = store.list_summaries();
        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["newer", "older"]);
        assert_eq!(summaries[0].title, "second");
    }

    #[test]
    fn test_remove_and_clear() {
        let store = ConversationContextStore::default();
        store.append("a", Role::User, "x");
        store.append("b", Role::User, "y");

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert_eq!(store.build_prompt("a", "fresh"), "fresh");
        assert_eq!(store.conversation_count(), 1);

        store.clear();
        assert_eq!(store.conversation_count(), 0);
    }

    #[test]
    fn test_zero_window_keeps_nothing() {
        let store = ConversationContextStore::new(ContextConfig::default().with_max_turns(0));
        store.append("c", Role::User, "Hello");

        assert_eq!(store.len("c"), 0);
        assert_eq!(store.build_prompt("c", "Hi"), "Hi");
        assert_eq!(store.summary("c").map(|s| s.message_count), Some(1));
    }
}
