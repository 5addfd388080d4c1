//! Minimal OpenAI-compatible chat completions client
//!
//! Talks to `api.openai.com` or any endpoint speaking the same
//! `/chat/completions` protocol. No retries, no streaming, no tools: callers
//! decide what a failure means.
//!
//! ```rust,ignore
//! use openai_client::{ChatRequest, Message, OpenAIClient};
//!
//! let client = OpenAIClient::from_env()?.with_timeout(Duration::from_secs(60))?;
//! let reply = client
//!     .chat_completion(
//!         ChatRequest::new("gpt-4o-mini")
//!             .message(Message::system("Answer in JSON."))
//!             .message(Message::user("List three CRMs."))
//!             .json_object(),
//!     )
//!     .await?;
//! println!("{}", reply.content);
//! ```

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::*;

use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAIClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Read `OPENAI_API_KEY`, and `OPENAI_BASE_URL` when it is set and non-empty.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;

        let client = Self::new(key);
        match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Ok(client.with_base_url(url)),
            _ => Ok(client),
        }
    }

    /// Point at a proxy or compatible provider. A trailing `/` is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a whole-request timeout to every call.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenAIError::Config(e.to_string()))?;
        Ok(self)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one completion and return its first choice.
    ///
    /// A choice with `null` content (refusal, tool call) is an `Api` error.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let started = Instant::now();
        let body = self.post_completion(&request).await?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::Api("completion returned no choices".into()))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| OpenAIError::Api("completion choice has no text content".into()))?;

        debug!(
            model = %request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            finish_reason = ?choice.finish_reason,
            total_tokens = body.usage.map(|u| u.total_tokens),
            "Chat completion finished"
        );

        Ok(ChatResponse {
            content,
            finish_reason: choice.finish_reason,
            usage: body.usage,
        })
    }

    async fn post_completion(&self, request: &ChatRequest) -> Result<types::CompletionBody> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, url = %url, "Chat completion request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Chat completion rejected");
            return Err(error_for_status(status, &text));
        }

        response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))
    }
}

/// Map a non-2xx status and body to an error, preferring the API's message.
fn error_for_status(status: StatusCode, body: &str) -> OpenAIError {
    let message = serde_json::from_str::<types::ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => OpenAIError::RateLimited(message),
        _ => OpenAIError::Api(format!("{status}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OpenAIClient::new("sk-test").with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = OpenAIClient::new("sk-secret");
        assert!(!format!("{client:?}").contains("sk-secret"));
    }

    #[test]
    fn test_error_for_status() {
        let err = error_for_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "slow down", "type": "rate_limit"}}"#,
        );
        assert!(matches!(err, OpenAIError::RateLimited(m) if m == "slow down"));

        let err = error_for_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, OpenAIError::Api(m) if m.contains("upstream down")));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let client = OpenAIClient::new("sk-test")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(5))
            .unwrap();

        let err = client
            .chat_completion(ChatRequest::new("gpt-4o-mini").message(Message::user("hi")))
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAIError::Network(_) | OpenAIError::Timeout));
    }
}
