//! OpenAI implementation of the completion service.
//!
//! # Example
//!
//! ```rust,ignore
//! use citation_analysis::ai::OpenAICompletion;
//!
//! let completion = OpenAICompletion::from_env()?.with_model("gpt-4o-mini");
//! let queue = AnalysisQueue::new(store, completion, QueueConfig::default());
//! ```

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError};

use crate::error::CompletionError;
use crate::traits::completion::CompletionService;

/// Completion service backed by the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAICompletion {
    client: OpenAIClient,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    json_mode: bool,
}

impl OpenAICompletion {
    /// Wrap an existing client. Defaults: `gpt-4o-mini`, temperature 0,
    /// JSON object output.
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: None,
            json_mode: true,
        }
    }

    /// Create from `OPENAI_API_KEY` (and `OPENAI_BASE_URL` if set).
    pub fn from_env() -> Result<Self, CompletionError> {
        let client = OpenAIClient::from_env().map_err(map_error)?;
        Ok(Self::new(client))
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Disable the `json_object` response format, for endpoints without it.
    pub fn without_json_mode(mut self) -> Self {
        self.json_mode = false;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, system_prompt: &str, user_prompt: &str) -> ChatRequest {
        let mut request = ChatRequest::new(&self.model)
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .temperature(self.temperature);

        if let Some(limit) = self.max_tokens {
            request = request.token_limit(limit);
        }
        if self.json_mode {
            request = request.json_object();
        }
        request
    }
}

#[async_trait]
impl CompletionService for OpenAICompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        let response = self
            .client
            .chat_completion(self.request(system_prompt, user_prompt))
            .await
            .map_err(map_error)?;

        if response.content.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(response.content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn map_error(err: OpenAIError) -> CompletionError {
    match err {
        OpenAIError::RateLimited(_) => CompletionError::RateLimited,
        OpenAIError::Timeout => CompletionError::Transport("request timed out".into()),
        OpenAIError::Network(e) | OpenAIError::Parse(e) => CompletionError::Transport(e),
        OpenAIError::Api(e) | OpenAIError::Config(e) => CompletionError::Api(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let completion = OpenAICompletion::new(OpenAIClient::new("sk-test"))
            .with_model("gpt-4o")
            .with_max_tokens(800);
        let request = completion.request("sys", "user");

        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.messages, vec![Message::system("sys"), Message::user("user")]);
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(800));
        assert!(request.response_format.is_some());

        let plain = completion.without_json_mode().request("s", "u");
        assert!(plain.response_format.is_none());
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_error(OpenAIError::RateLimited("429".into())),
            CompletionError::RateLimited
        ));
        assert!(matches!(
            map_error(OpenAIError::Network("reset".into())),
            CompletionError::Transport(_)
        ));
        assert!(matches!(
            map_error(OpenAIError::Api("500".into())),
            CompletionError::Api(_)
        ));
    }
}
