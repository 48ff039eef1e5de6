//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::sync::Arc;

use aurora_config::Config;
use aurora_conversation::{ChatService, ConversationContextStore};
use aurora_providers::GeminiProvider;
use tracing::info;

mod chat;
mod info;
mod init;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// Adding a command means implementing this trait and wiring a variant in
/// `main`; no runtime casting or boxing is involved.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Everything a chat needs, built once per process.
struct CommonComponents {
    config: Config,
    service: ChatService<GeminiProvider>,
}

/// Load config and wire provider, store and service together.
fn init_common_components(
    model: Option<String>,
    max_turns: Option<usize>,
) -> anyhow::Result<CommonComponents> {
    let mut config = Config::load()?;
    if let Some(max_turns) = max_turns {
        config.conversation.max_turns = max_turns;
        config.validate()?;
    }

    let mut provider = GeminiProvider::new(config.provider.api_key.clone());
    if let Some(base_url) = &config.provider.base_url {
        provider = provider.with_base_url(base_url.clone());
    }

    let store = Arc::new(ConversationContextStore::new(config.conversation.clone()));
    let model = model.unwrap_or_else(|| config.provider.model.clone());
    info!("Using model: {model}");

    let service = ChatService::new(provider, store).with_model(model);

    Ok(CommonComponents { config, service })
}
