use std::time::Duration;

use reqwest::Client;

use super::TextGenerator;
use super::error::LlmError;
use super::types::{ChatMessage, ChatRequest, ChatResponse, CompletionOptions, ResponseFormat};

pub const API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// HTTP client for an OpenAI-compatible chat completions endpoint.
pub struct ChatClient {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model, API_URL.to_string(), Duration::from_secs(60))
    }

    /// Create a client pointing at a custom endpoint (useful for testing and
    /// self-hosted gateways).
    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            model,
            client,
            base_url,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(LlmError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<ChatResponse>().await?;
        Ok(body)
    }
}

impl TextGenerator for ChatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then(ResponseFormat::json_object),
        };

        let response = self.send_chat(&req).await?;
        response
            .first_content()
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }
}
