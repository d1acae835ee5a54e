//! Chat-completion client for the text-generation service.
//!
//! Sends role-tagged messages to an OpenAI-compatible
//! `/v1/chat/completions` endpoint and returns the first choice's text.
//! Transport failures and non-2xx responses are returned as errors; the
//! answer engine treats them as hard failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sojourn_core::config::CompletionConfig;
use sojourn_core::types::ChatMessage;

use crate::error::RagError;

/// A chat-style text-generation backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a reply for `messages`.
    ///
    /// Returns the reply trimmed of surrounding whitespace, or an empty
    /// string when the service produced no content.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, RagError>;
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    // Newer deployments read this name instead of `max_tokens`.
    max_completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn extract_text(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

// =============================================================================
// HttpCompletionClient
// =============================================================================

/// [`CompletionClient`] over HTTPS with Bearer authentication.
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpCompletionClient {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self, RagError> {
        let base = config.base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(RagError::Config("completion base_url is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/chat/completions", base),
            api_key: api_key.into(),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, RagError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
            max_completion_tokens: max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            temperature,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), "Completion service returned an error");
            return Err(RagError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RagError::Decode(format!("invalid completion response: {}", e)))?;

        Ok(extract_text(parsed))
    }
}
