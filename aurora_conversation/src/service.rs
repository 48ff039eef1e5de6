//! One chat request, end to end.
//!
//! The `ChatService` is what an HTTP handler or CLI calls per incoming
//! message: it frames the message with stored history, calls the provider,
//! and records the exchange only after a usable reply came back.

use std::sync::Arc;

use aurora_core::{LLMProvider, ProviderError};
use thiserror::Error;
use tracing::{debug, info};

use crate::store::ConversationContextStore;

/// Errors that can occur while serving a chat request.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is required")]
    EmptyMessage,

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("LLM provider error: {0}")]
    Provider(anyhow::Error),

    #[error("Empty response from LLM")]
    EmptyResponse,
}

impl ChatError {
    /// Classify a provider failure. Typed [`ProviderError`]s are matched
    /// directly; anything else falls back to its message text.
    #[must_use]
    pub fn from_provider(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ProviderError>() {
            Some(ProviderError::InvalidApiKey(msg)) => Self::InvalidApiKey(msg.clone()),
            Some(ProviderError::QuotaExceeded(msg)) => Self::QuotaExceeded(msg.clone()),
            Some(_) => Self::Provider(err),
            None => {
                let message = err.to_string();
                if message.contains("API key") {
                    Self::InvalidApiKey(message)
                } else if message.contains("quota") || message.contains("limit") {
                    Self::QuotaExceeded(message)
                } else {
                    Self::Provider(err)
                }
            }
        }
    }

    /// HTTP status a web front-end should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::EmptyMessage => 400,
            Self::InvalidApiKey(_) => 401,
            Self::QuotaExceeded(_) => 429,
            Self::Provider(_) | Self::EmptyResponse => 500,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// `None` (or empty) means the call has no memory
    pub conversation_id: Option<String>,
    pub message: String,
}

impl ChatRequest {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Token usage information for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnUsage {
    pub prompt: u32,
    pub completion: u32,
    pub total: u32,
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub reply: String,
    pub usage: Option<TurnUsage>,
    pub conversation_id: Option<String>,
    /// Turns retained for the conversation after this exchange
    pub retained_turns: usize,
}

pub struct ChatService<P = Arc<dyn LLMProvider>>
where
    P: Send + Sync,
{
    provider: P,
    store: Arc<ConversationContextStore>,
    model: String,
}

impl<P> ChatService<P>
where
    P: LLMProvider + Send + Sync,
{
    /// Create a service using the provider's default model.
    pub fn new(provider: P, store: Arc<ConversationContextStore>) -> Self {
        let model = provider.get_default_model().to_string();
        Self {
            provider,
            store,
            model,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<ConversationContextStore> {
        &self.store
    }

    /// Serve one message.
    ///
    /// History is only touched after the provider returned a non-empty
    /// reply; a failed call leaves the conversation unchanged.
    pub async fn send(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        if request.message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let conversation_id = request.conversation_id.filter(|id| !id.is_empty());
        let prompt = conversation_id.as_deref().map_or_else(
            || request.message.clone(),
            |id| self.store.build_prompt(id, &request.message),
        );

        info!(
            "Sending chat request: conversation={}, prompt_chars={}",
            conversation_id.as_deref().unwrap_or("-"),
            prompt.chars().count()
        );

        let response = self
            .provider
            .generate(&prompt, &self.model)
            .await
            .map_err(ChatError::from_provider)?;

        if response.content.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }

        let retained_turns = conversation_id.as_deref().map_or(0, |id| {
            self.store
                .append_exchange(id, request.message, response.content.clone());
            self.store.len(id)
        });

        debug!("Chat request completed ({retained_turns} turns retained)");

        Ok(ChatReply {
            reply: response.content,
            usage: response.usage.map(|u| TurnUsage {
                prompt: u.prompt_tokens,
                completion: u.completion_tokens,
                total: u.total_tokens,
            }),
            conversation_id,
            retained_turns,
        })
    }
}
