use async_trait::async_trait;
use aurora_core::{LLMProvider, LLMResponse, ProviderError, Usage};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use crate::retry::{RetryPolicy, retry_with_backoff};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        info!("Creating GeminiProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    /// Helper method to send a single request
    async fn try_send(&self, url: &str, request: &Value) -> Result<LLMResponse, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or(body);
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        let body: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_generate_response(&body)
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn generate(&self, prompt: &str, model: &str) -> anyhow::Result<LLMResponse> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::InvalidApiKey(
                "No API key provided. Set GEMINI_API_KEY or provider.api_key in the config."
                    .to_string(),
            )
            .into());
        }

        let request = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        let url = self.endpoint(model);

        info!("Sending request to Gemini API: model={}", model);

        let response = retry_with_backoff(
            || self.try_send(&url, &request),
            &self.retry,
            ProviderError::is_retryable,
        )
        .await?;

        info!("Received response from Gemini API");
        Ok(response)
    }

    fn get_default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }
}

/// `error.message` from a Gemini error body, if present.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

fn token_count(value: &Value) -> u32 {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

/// Extract reply text and usage from a `generateContent` response.
pub fn parse_generate_response(body: &Value) -> Result<LLMResponse, ProviderError> {
    let Some(parts) = body["candidates"][0]["content"]["parts"].as_array() else {
        let reason = body["promptFeedback"]["blockReason"]
            .as_str()
            .map_or_else(
                || "missing candidates".to_string(),
                |r| format!("prompt blocked ({r})"),
            );
        return Err(ProviderError::InvalidResponse(reason));
    };

    let content: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

    let metadata = &body["usageMetadata"];
    let usage = metadata.is_object().then(|| Usage {
        prompt_tokens: token_count(&metadata["promptTokenCount"]),
        completion_tokens: token_count(&metadata["candidatesTokenCount"]),
        total_tokens: token_count(&metadata["totalTokenCount"]),
    });

    Ok(LLMResponse { content, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_parse_text_and_usage() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello " }, { "text": "there" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6 }
        });

        let response = parse_generate_response(&body).expect("Failed to parse response");

        assert_eq!(response.content, "Hello there");
        assert_eq!(
            response.usage,
            Some(Usage {
                prompt_tokens: 4,
                completion_tokens: 2,
                total_tokens: 6,
            })
        );
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });

        let err = parse_generate_response(&body).err();

        assert!(matches!(
            err,
            Some(ProviderError::InvalidResponse(ref msg)) if msg.contains("SAFETY")
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("API key not valid."));
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_endpoint_and_base_url() {
        let provider = GeminiProvider::new("key".to_string())
            .with_base_url("http://localhost:8080/v1beta/".to_string());
        assert_eq!(
            provider.endpoint("gemini-1.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(provider.get_default_model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let provider = GeminiProvider::new(String::new()).with_retry_policy(RetryPolicy::none());

        let err = provider
            .generate("Hi", DEFAULT_MODEL)
            .await
            .err()
            .and_then(|e| e.downcast::<ProviderError>().ok());

        assert!(matches!(err, Some(ProviderError::InvalidApiKey(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let provider = GeminiProvider::new("key".to_string())
            .with_base_url("http://127.0.0.1:9".to_string())
            .with_retry_policy(RetryPolicy::none());

        let err = provider
            .generate("Hi", DEFAULT_MODEL)
            .await
            .err()
            .and_then(|e| e.downcast::<ProviderError>().ok());

        assert!(matches!(err, Some(ProviderError::Transport(_))));
    }
}
