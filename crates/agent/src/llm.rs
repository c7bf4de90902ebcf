use std::time::Duration;

use async_trait::async_trait;
use deskbot_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm api key is not configured")]
    NotConfigured,
    #[error("llm request timed out after {0:?}")]
    Timeout(Duration),
    #[error("llm transport failed: {0}")]
    Transport(String),
    #[error("llm returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one prompt. `Ok(None)` means the provider answered without any text.
    async fn complete(&self, prompt: &str) -> Result<Option<String>, LlmError>;
}

/// Chat-completions client for OpenRouter and other OpenAI-compatible endpoints.
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl OpenRouterClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.base_url.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.expose_secret().trim().is_empty()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    fn map_transport_error(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let Some(api_key) = &self.api_key else {
            return Err(LlmError::NotConfigured);
        };

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|error| self.map_transport_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let payload: Value = response.json().await.map_err(|error| {
            if error.is_timeout() {
                LlmError::Timeout(self.timeout)
            } else {
                LlmError::Decode(error.to_string())
            }
        })?;
        debug!(model = %self.model, "llm completion received");

        Ok(extract_text(&payload))
    }
}

/// Pulls the answer out of a chat-completions payload.
///
/// Tries `choices[0].message.content`, then `choices[0].text`. Without choices, falls back
/// to a top-level `message` string and finally to the serialized payload.
fn extract_text(payload: &Value) -> Option<String> {
    let first_choice =
        payload.get("choices").and_then(Value::as_array).and_then(|choices| choices.first());

    if let Some(choice) = first_choice {
        return choice
            .pointer("/message/content")
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
            .or_else(|| choice.get("text").and_then(Value::as_str))
            .map(ToString::to_string);
    }

    payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(ToString::to_string)
        .or_else(|| Some(payload.to_string()))
}
