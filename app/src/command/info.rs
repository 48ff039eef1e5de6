use aurora_config::{API_KEY_ENV, Config};
use aurora_core::util::{mask_secret, truncate_with_ellipsis};
use aurora_providers::DEFAULT_BASE_URL;

/// Strategy for displaying configuration information.
///
/// Prints the provider settings (API key masked) and the conversation
/// window and prompt labels.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== aurora Configuration ===\n");

        println!("Provider:");
        let key_source = if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty()) {
            API_KEY_ENV
        } else {
            "config file"
        };
        println!(
            "  API Key: {} (from {key_source})",
            mask_secret(&config.provider.api_key)
        );
        println!("  Model: {}", config.provider.model);
        println!(
            "  Base URL: {}",
            config
                .provider
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
        );
        println!();

        let conversation = &config.conversation;
        println!("Conversation:");
        println!("  Max Turns: {}", conversation.max_turns);
        println!(
            "  History Intro: {}",
            truncate_with_ellipsis(&conversation.template.history_intro, 60)
        );
        println!("  User Label: {}", conversation.template.user_label);
        println!("  Assistant Label: {}", conversation.template.assistant_label);

        Ok(())
    }
}
