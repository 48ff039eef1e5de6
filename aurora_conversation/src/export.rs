//! JSON export of every tracked conversation.

use aurora_core::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedConversation {
    #[serde(flatten)]
    pub summary: ConversationSummary,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub conversations: Vec<ExportedConversation>,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

impl ExportSnapshot {
    #[must_use]
    pub fn new(conversations: Vec<ExportedConversation>) -> Self {
        Self {
            conversations,
            export_date: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Suggested file name, e.g. `aurora-chats-2024-05-01.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("aurora-chats-{}.json", self.export_date.format("%Y-%m-%d"))
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConversationContextStore;
    use aurora_core::Role;

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_export_round_trips_through_json() {
        let store = ConversationContextStore::default();
        store.append("c1", Role::User, "Hello");
        store.append("c1", Role::Assistant, "Hi there");

        let snapshot = store.export();
        let json = snapshot.to_json_pretty().expect("Failed to serialize export");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("Invalid JSON");

        assert_eq!(parsed["conversations"][0]["id"], "c1");
        assert_eq!(parsed["conversations"][0]["title"], "Hello");
        assert_eq!(parsed["conversations"][0]["turns"][1]["role"], "assistant");
        assert!(parsed["export_date"].is_string());

        let restored: ExportSnapshot = serde_json::from_str(&json).expect("Failed to parse export");
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_file_name_uses_export_date() {
        let snapshot = ExportSnapshot::new(Vec::new());
        let name = snapshot.file_name();
        assert!(name.starts_with("aurora-chats-"));
        assert!(name.ends_with(".json"));
    }
}
