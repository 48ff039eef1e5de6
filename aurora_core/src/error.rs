use thiserror::Error;

/// Failure reported by a text-generation backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Classify a failed HTTP response by status and body text.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        let lower = message.to_lowercase();
        if status == 401 || status == 403 || lower.contains("api key") {
            Self::InvalidApiKey(message)
        } else if status == 429 || lower.contains("quota") {
            Self::QuotaExceeded(message)
        } else {
            Self::Api { status, message }
        }
    }

    /// Whether repeating the same request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidApiKey(_) | Self::InvalidResponse(_) => false,
            Self::QuotaExceeded(_) | Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
        }
    }
}
