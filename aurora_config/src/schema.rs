use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use aurora_core::ContextConfig;

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const CONFIG_DIR_NAME: &str = "aurora";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub conversation: ContextConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "ProviderConfig::default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: Self::default_model(),
            base_url: None,
        }
    }
}

impl ProviderConfig {
    fn default_model() -> String {
        "gemini-1.5-flash".to_string()
    }
}

impl Config {
    /// Load `~/aurora/config.json`, then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'aurora init' to create config.",
                config_path.display()
            );
        }

        let mut config = Self::from_path(&config_path)?;
        config.apply_env_key(std::env::var(API_KEY_ENV).ok());
        config.validate()?;

        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// A non-empty key from the environment wins over the file.
    pub fn apply_env_key(&mut self, env_key: Option<String>) {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.provider.api_key = key;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provider.api_key.trim().is_empty() {
            anyhow::bail!(
                "No API key configured. Set {API_KEY_ENV} or provider.api_key in the config file."
            );
        }
        if self.conversation.max_turns == 0 {
            anyhow::bail!("conversation.max_turns must be at least 1");
        }
        Ok(())
    }

    fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR_NAME))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, Self::template())?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your Gemini API key");
        println!("      (or export {API_KEY_ENV})");
        println!("   2. Run 'aurora chat' to start a conversation");
        println!();
        println!("🔧 Configuration options:");
        println!("   - model: Gemini model to use (gemini-1.5-flash, gemini-1.5-pro, etc.)");
        println!("   - max_turns: Number of turns remembered per conversation");
        println!("   - user_label / assistant_label: Names used when replaying history");
        println!();
        Ok(())
    }

    /// Config file contents written by `aurora init`.
    #[must_use]
    pub const fn template() -> &'static str {
        r#"{
  "provider": {
    "api_key": "your-gemini-api-key-here",
    "model": "gemini-1.5-flash"
  },
  "conversation": {
    "max_turns": 20,
    "history_intro": "Here is our previous conversation:",
    "user_label": "User",
    "assistant_label": "Assistant"
  }
}"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_template_parses_to_defaults() {
        let config = Config::from_json(Config::template()).expect("Template must parse");

        assert_eq!(config.provider.model, "gemini-1.5-flash");
        assert_eq!(config.conversation, ContextConfig::default());
        assert!(config.provider.base_url.is_none());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_missing_sections_default() {
        let config = Config::from_json(r#"{"provider": {"api_key": "k"}}"#)
            .expect("Minimal config must parse");

        assert_eq!(config.provider.api_key, "k");
        assert_eq!(config.conversation.max_turns, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_key_overrides_file() {
        let mut config = Config::default();
        config.provider.api_key = "from-file".to_string();

        config.apply_env_key(Some(String::new()));
        assert_eq!(config.provider.api_key, "from-file");

        config.apply_env_key(Some("from-env".to_string()));
        assert_eq!(config.provider.api_key, "from-env");

        config.apply_env_key(None);
        assert_eq!(config.provider.api_key, "from-env");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.provider.api_key = "k".to_string();
        config.conversation.max_turns = 0;
        assert!(config.validate().is_err());

        config.conversation.max_turns = 4;
        assert!(config.validate().is_ok());
    }
}
