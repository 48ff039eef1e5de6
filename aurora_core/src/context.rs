//! Window size and prompt framing for conversation context.

use serde::{Deserialize, Serialize};

use crate::Role;

/// Default number of turns retained per conversation.
pub const DEFAULT_MAX_TURNS: usize = 20;

pub const DEFAULT_HISTORY_INTRO: &str = "Here is our previous conversation:";
pub const DEFAULT_USER_LABEL: &str = "User";
pub const DEFAULT_ASSISTANT_LABEL: &str = "Assistant";

/// Fixed strings used to flatten history into a single prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default = "PromptTemplate::default_history_intro")]
    pub history_intro: String,
    #[serde(default = "PromptTemplate::default_user_label")]
    pub user_label: String,
    #[serde(default = "PromptTemplate::default_assistant_label")]
    pub assistant_label: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            history_intro: Self::default_history_intro(),
            user_label: Self::default_user_label(),
            assistant_label: Self::default_assistant_label(),
        }
    }
}

impl PromptTemplate {
    fn default_history_intro() -> String {
        DEFAULT_HISTORY_INTRO.to_string()
    }

    fn default_user_label() -> String {
        DEFAULT_USER_LABEL.to_string()
    }

    fn default_assistant_label() -> String {
        DEFAULT_ASSISTANT_LABEL.to_string()
    }

    /// Label printed in front of a turn by `role`.
    #[must_use]
    pub fn label(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user_label,
            Role::Assistant => &self.assistant_label,
        }
    }
}

/// Configuration for a conversation context store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum turns kept per conversation before the oldest are evicted
    #[serde(default = "ContextConfig::default_max_turns")]
    pub max_turns: usize,
    #[serde(flatten)]
    pub template: PromptTemplate,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            template: PromptTemplate::default(),
        }
    }
}

impl ContextConfig {
    const fn default_max_turns() -> usize {
        DEFAULT_MAX_TURNS
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.max_turns, 20);
        assert_eq!(config.template.label(Role::User), "User");
        assert_eq!(config.template.label(Role::Assistant), "Assistant");
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_partial_json_fills_defaults() {
        let config: ContextConfig =
            serde_json::from_str(r#"{"max_turns": 6, "user_label": "You"}"#)
                .expect("Failed to parse context config");

        assert_eq!(config.max_turns, 6);
        assert_eq!(config.template.user_label, "You");
        assert_eq!(config.template.assistant_label, DEFAULT_ASSISTANT_LABEL);
        assert_eq!(config.template.history_intro, DEFAULT_HISTORY_INTRO);
    }
}
